//! Ownership checks shared by every single-record contact operation.
//!
//! A record is looked up first; a missing record is `NotFound`, an existing
//! record owned by someone else is `Forbidden`. The two are never conflated.

use tracing::warn;
use uuid::Uuid;

use super::repo_types::Contact;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Authorized,
    Forbidden,
}

/// What the caller is trying to do. Only affects the denial message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Update,
    Delete,
    Modify,
    FetchImage,
}

impl Action {
    fn denial(self) -> &'static str {
        match self {
            Action::View => "Not authorized to view this contact",
            Action::Update => "Not authorized to update this contact",
            Action::Delete => "Not authorized to delete this contact",
            Action::Modify => "Not authorized to modify this contact",
            Action::FetchImage => "Not authorized to access this image",
        }
    }
}

/// Records carrying an owning-user reference.
pub trait Owned {
    fn owner(&self) -> Uuid;
}

impl Owned for Contact {
    fn owner(&self) -> Uuid {
        self.user_id
    }
}

/// Pure decision: the caller may act iff it is the record's owner.
pub fn check_ownership<T: Owned + ?Sized>(record: &T, caller: Uuid) -> Access {
    if record.owner() == caller {
        Access::Authorized
    } else {
        Access::Forbidden
    }
}

/// Resolves a lookup result into the record the caller may act on.
pub fn authorize<T: Owned>(record: Option<T>, caller: Uuid, action: Action) -> Result<T, ApiError> {
    let record = record.ok_or_else(|| ApiError::not_found("Contact not found"))?;
    match check_ownership(&record, caller) {
        Access::Authorized => Ok(record),
        Access::Forbidden => {
            warn!(%caller, owner = %record.owner(), ?action, "ownership check denied");
            Err(ApiError::forbidden(action.denial()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Doc(Uuid);

    impl Owned for Doc {
        fn owner(&self) -> Uuid {
            self.0
        }
    }

    #[test]
    fn owner_is_authorized() {
        let owner = Uuid::new_v4();
        assert_eq!(check_ownership(&Doc(owner), owner), Access::Authorized);
    }

    #[test]
    fn other_user_is_forbidden() {
        assert_eq!(check_ownership(&Doc(Uuid::new_v4()), Uuid::new_v4()), Access::Forbidden);
    }

    #[test]
    fn ids_parsed_from_different_spellings_compare_equal() {
        let id = Uuid::new_v4();
        let upper = Uuid::parse_str(&id.to_string().to_uppercase()).unwrap();
        let simple = Uuid::parse_str(&id.simple().to_string()).unwrap();
        assert_eq!(check_ownership(&Doc(upper), simple), Access::Authorized);
    }

    #[test]
    fn missing_record_is_not_found_not_forbidden() {
        let err = authorize::<Doc>(None, Uuid::new_v4(), Action::Delete).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn denial_message_names_the_action() {
        let err = authorize(Some(Doc(Uuid::new_v4())), Uuid::new_v4(), Action::FetchImage)
            .unwrap_err();
        match err {
            ApiError::Forbidden(msg) => assert_eq!(msg, "Not authorized to access this image"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
