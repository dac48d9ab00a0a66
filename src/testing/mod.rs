use std::sync::Arc;

use crate::identity::{Identity, IdentityGateway, MemoryAccountStore, PasswordIdentityService};

/// Identity fixture: id `<name>-id`, email `<name>@example.com`
pub fn identity(name: &str, display_name: Option<&str>) -> Identity {
    Identity {
        id: format!("{}-id", name),
        display_name: display_name.map(str::to_string),
        email: format!("{}@example.com", name),
    }
}

/// Gateway over a fresh in-memory account store, signed out
pub fn gateway() -> IdentityGateway {
    let service = PasswordIdentityService::new(Arc::new(MemoryAccountStore::new()), 6);
    IdentityGateway::new(Arc::new(service))
}

/// Gateway whose session is already signed in as `identity`
pub fn signed_in_gateway(identity: Identity) -> IdentityGateway {
    let service = PasswordIdentityService::resumed(Arc::new(MemoryAccountStore::new()), 6, identity);
    IdentityGateway::new(Arc::new(service))
}
