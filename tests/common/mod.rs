//! Shared fixtures for the integration tests

#![allow(dead_code)]

use dyehouse::prelude::*;

pub const PASSWORD: &str = "secret1";

pub fn new_user(username: &str, role: Role) -> NewUser {
    NewUser {
        username: username.to_string(),
        name: username.to_string(),
        role,
        password: PASSWORD.to_string(),
        email: None,
        department: None,
    }
}

/// One admin, one operator, two factory users and one salesperson
pub fn seeded_store() -> InMemoryStore {
    InMemoryStore::with_users([
        new_user("admin", Role::Admin),
        new_user("olivia", Role::Operator),
        new_user("frank", Role::Factory),
        new_user("fiona", Role::Factory),
        new_user("sue", Role::Sales),
    ])
    .unwrap()
}

pub async fn login(store: &InMemoryStore, username: &str) -> Session {
    store
        .login(&LoginRequest {
            username: username.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// A valid draft with one SL item, assigned to `salesperson`
pub fn draft_for(salesperson: &Session) -> OrderDraft {
    OrderDraft {
        sdy_number: "SDY-100".to_string(),
        date: Some(today()),
        party_name: "ABC".to_string(),
        delivery_party: "XYZ".to_string(),
        salesperson_id: Some(salesperson.user_id()),
        sl_numbers_with_quantities: vec![SlQuantity {
            sl_number: "SL-1".to_string(),
            quantity: Some(5),
        }],
        ..Default::default()
    }
}

pub struct Actors {
    pub store: InMemoryStore,
    pub admin: Session,
    pub operator: Session,
    pub factory: Session,
    pub other_factory: Session,
    pub sales: Session,
}

pub async fn actors() -> Actors {
    let store = seeded_store();
    Actors {
        admin: login(&store, "admin").await,
        operator: login(&store, "olivia").await,
        factory: login(&store, "frank").await,
        other_factory: login(&store, "fiona").await,
        sales: login(&store, "sue").await,
        store,
    }
}

impl Actors {
    pub async fn order(&self) -> Order {
        self.store
            .create_order(&self.operator, &draft_for(&self.sales))
            .await
            .unwrap()
    }
}
