#![allow(dead_code)]

use api_billing::Billing;
use common::{catalog::Catalog, jwt::JwtClaims};
use db::models::{server::Server, user::User};
use test_utils::{FakeBilling, FakePanel, MemoryQueue, MemoryStore, factory};

pub struct Harness {
    pub store: MemoryStore,
    pub panel: FakePanel,
    pub queue: MemoryQueue,
    pub gateway: FakeBilling,
    pub catalog: Catalog,
    pub user: User,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let user = store.insert_user(factory::user());
        Self {
            store,
            panel: FakePanel::new(),
            queue: MemoryQueue::default(),
            gateway: FakeBilling::new(),
            catalog: factory::catalog(),
            user,
        }
    }

    pub fn billing(&self) -> Billing<'_, MemoryStore, FakePanel, MemoryQueue, FakeBilling> {
        Billing {
            store: &self.store,
            panel: &self.panel,
            queue: &self.queue,
            gateway: &self.gateway,
            catalog: &self.catalog,
        }
    }

    pub fn claims(&self) -> JwtClaims {
        JwtClaims {
            user_id: self.user.id,
            email: self.user.email.clone(),
            is_admin: false,
            exp: usize::MAX,
        }
    }

    pub fn admin_claims(&self) -> JwtClaims {
        JwtClaims {
            is_admin: true,
            ..self.claims()
        }
    }

    /// Stores a server owned by the harness user, starting from the factory default.
    pub fn server(&self, apply: impl FnOnce(&mut Server)) -> Server {
        let mut server = factory::server(self.user.id);
        apply(&mut server);
        self.store.insert_server(server)
    }
}
