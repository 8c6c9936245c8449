#![allow(dead_code)]

use std::sync::Arc;

use account_policy::web::{configure, AppState};
use account_policy::{
    AccessPolicy, AccountService, Argon2Hasher, Argon2Params, MemoryStore, NewUser,
    PasswordHasher, PolicyConfig, TokenService, UserId, UserRecord, UserStore,
};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{test, web, App};
use chrono::Duration;

pub const JOHN_PASSWORD: &str = "johnpassword";
pub const ADMIN_PASSWORD: &str = "adminpassword";
const SECRET: &[u8] = b"test-signing-key";

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub state: web::Data<AppState>,
    pub john: UserRecord,
    pub admin: UserRecord,
}

fn cheap_hasher() -> Argon2Hasher {
    Argon2Hasher::new(Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("test hashing params")
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_policy(PolicyConfig::default())
    }

    pub fn with_policy(policy: PolicyConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let hasher = Arc::new(cheap_hasher());

        let john = store
            .insert(NewUser {
                username: "john".to_string(),
                email: "lennon@thebeatles.com".to_string(),
                first_name: "John".to_string(),
                last_name: "Lennon".to_string(),
                password_hash: hasher.hash(JOHN_PASSWORD).expect("hash"),
                is_active: true,
                is_staff: false,
            })
            .expect("insert john");

        let accounts = AccountService::new(store.clone(), hasher, AccessPolicy::new(policy))
            .expect("dummy hash");
        accounts
            .ensure_staff("admin", ADMIN_PASSWORD, "admin@thebeatles.com")
            .expect("bootstrap admin");
        let admin = store.find_by_username("admin").expect("admin exists");

        let tokens = TokenService::new(SECRET, Duration::minutes(5), Duration::days(7));
        let state = web::Data::new(AppState::new(accounts, tokens));

        Self {
            store,
            state,
            john,
            admin,
        }
    }

    pub fn token_for(&self, user: &UserRecord) -> String {
        self.state.tokens.issue(user).expect("issue token")
    }

    pub fn john_token(&self) -> String {
        self.token_for(&self.john)
    }

    pub fn admin_token(&self) -> String {
        self.token_for(&self.admin)
    }

    pub fn user(&self, id: UserId) -> Option<UserRecord> {
        self.store.get(id)
    }

    pub fn verifies(&self, id: UserId, password: &str) -> bool {
        let user = self.user(id).expect("user exists");
        cheap_hasher()
            .verify(password, &user.password_hash)
            .expect("stored hash parses")
    }
}

pub fn build_test_app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new().app_data(state).configure(configure)
}

pub fn bearer(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.insert_header(("Authorization", format!("Bearer {}", token)))
}
