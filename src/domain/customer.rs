use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CustomerId = Uuid;

/// A bank customer. Identity is system-assigned and immutable; the contact
/// fields have no update operation in this core. A customer owns zero or
/// more accounts, and deleting the customer removes them (and their
/// transaction history) with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Customer {
    pub fn new(name: String, email: String, phone: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
        }
    }
}

/// Syntactic email check applied at the service boundary: no whitespace,
/// exactly one `@`, a non-empty local part, and a domain with an interior dot.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}
