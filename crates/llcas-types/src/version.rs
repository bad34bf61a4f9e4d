use std::fmt;

/// Major version of the engine surface. Bumped on incompatible changes.
pub const VERSION_MAJOR: u32 = 0;
/// Minor version of the engine surface. Bumped when operations are added.
pub const VERSION_MINOR: u32 = 1;

/// Semantic version pair published by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    /// The version implemented by this build.
    pub const CURRENT: Self = Self {
        major: VERSION_MAJOR,
        minor: VERSION_MINOR,
    };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns `true` if an engine at `self` offers everything a consumer
    /// built against `required` may call.
    pub fn is_compatible_with(&self, required: Version) -> bool {
        self.major == required.major && self.minor >= required.minor
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_matches_constants() {
        assert_eq!(Version::CURRENT, Version::new(0, 1));
        assert_eq!(Version::CURRENT.to_string(), "0.1");
    }

    #[test]
    fn newer_minor_is_compatible() {
        let engine = Version::new(0, 3);
        assert!(engine.is_compatible_with(Version::new(0, 1)));
        assert!(engine.is_compatible_with(Version::new(0, 3)));
        assert!(!engine.is_compatible_with(Version::new(0, 4)));
    }

    #[test]
    fn major_mismatch_is_incompatible() {
        assert!(!Version::new(1, 5).is_compatible_with(Version::new(0, 1)));
    }
}
