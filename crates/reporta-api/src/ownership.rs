use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Forbidden,
}

impl Access {
    pub fn require(self) -> Result<(), ApiError> {
        match self {
            Access::Allow => Ok(()),
            Access::Forbidden => Err(ApiError::Forbidden),
        }
    }
}

/// `record_owner` must be the owner as persisted, never a caller-supplied value;
/// `caller` is only the "who is asking" side.
pub fn authorize(record_owner: Uuid, caller: Uuid) -> Access {
    if record_owner == caller {
        Access::Allow
    } else {
        Access::Forbidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_allowed() {
        let id = Uuid::new_v4();
        assert_eq!(authorize(id, id), Access::Allow);
        assert!(authorize(id, id).require().is_ok());
    }

    #[test]
    fn anyone_else_is_forbidden() {
        let access = authorize(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(access, Access::Forbidden);
        assert!(matches!(access.require(), Err(ApiError::Forbidden)));
    }
}
