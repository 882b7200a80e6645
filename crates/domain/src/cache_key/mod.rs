mod resource_type;

pub use resource_type::ResourceType;

use crate::CacheError;
use std::fmt;
use std::sync::Arc;

/// Identifies one built artifact: a group rendered for a resource type,
/// either minimized or not.
///
/// Equality and hashing cover all three fields, so the key is also the unit
/// of single-flight locking and check throttling.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    group_name: Arc<str>,
    resource_type: ResourceType,
    minimize: bool,
}

impl CacheKey {
    #[inline]
    pub fn new(group_name: impl Into<Arc<str>>, resource_type: ResourceType, minimize: bool) -> Self {
        Self {
            group_name: group_name.into(),
            resource_type,
            minimize,
        }
    }

    /// Minimized key, the default rendering of a group.
    #[inline]
    pub fn minimized(group_name: impl Into<Arc<str>>, resource_type: ResourceType) -> Self {
        Self::new(group_name, resource_type, true)
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn minimize(&self) -> bool {
        self.minimize
    }

    /// A key without a group name does not name anything and is rejected
    /// before it reaches any store or lock map.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.group_name.trim().is_empty() {
            return Err(CacheError::invalid("cache key must name a group"));
        }
        Ok(())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group_name, self.resource_type)?;
        if self.minimize {
            write!(f, " (minimized)")?;
        }
        Ok(())
    }
}
