use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use common::error::{AppError, Res};
use panel::{NewPanelServer, NewPanelUser, PanelApi, PanelServer, PanelUser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCall {
    FindUserByEmail(String),
    CreateUser(NewPanelUser),
    FindServerByExternalId(String),
    CreateServer(NewPanelServer),
    Suspend(i64),
    Unsuspend(i64),
    Delete { id: i64, force: bool },
}

#[derive(Default)]
struct State {
    calls: Vec<PanelCall>,
    users: Vec<PanelUser>,
    servers: HashMap<String, PanelServer>,
    next_id: i64,
    create_server_error: Option<(u16, String)>,
    action_error: Option<(u16, String)>,
}

/// `PanelApi` double. Created servers are kept by external id, so a second
/// lookup finds what an earlier call created.
#[derive(Clone, Default)]
pub struct FakePanel {
    state: Arc<Mutex<State>>,
}

impl FakePanel {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("panel mutex poisoned")
    }

    fn next_id(state: &mut State) -> i64 {
        state.next_id += 1;
        100 + state.next_id
    }

    pub fn calls(&self) -> Vec<PanelCall> {
        self.state().calls.clone()
    }

    pub fn created_servers(&self) -> Vec<NewPanelServer> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                PanelCall::CreateServer(body) => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    /// Registers an existing panel account.
    pub fn with_user(&self, email: &str) -> PanelUser {
        let mut state = self.state();
        let id = Self::next_id(&mut state);
        let user = PanelUser {
            id,
            uuid: format!("panel-user-{}", id),
            username: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            external_id: None,
        };
        state.users.push(user.clone());
        user
    }

    /// Registers a server that already exists on the panel.
    pub fn with_server(&self, external_id: &str) -> PanelServer {
        let mut state = self.state();
        let id = Self::next_id(&mut state);
        let server = panel_server(id, "existing", external_id);
        state.servers.insert(external_id.to_string(), server.clone());
        server
    }

    /// Makes every `create_server` call fail with the given panel error.
    pub fn fail_create_server(&self, status: u16, message: &str) {
        self.state().create_server_error = Some((status, message.to_string()));
    }

    /// Makes suspend, unsuspend and delete calls fail.
    pub fn fail_actions(&self, status: u16, message: &str) {
        self.state().action_error = Some((status, message.to_string()));
    }

    pub fn reset_failures(&self) {
        let mut state = self.state();
        state.create_server_error = None;
        state.action_error = None;
    }

    fn action(&self, call: PanelCall) -> Res<()> {
        let mut state = self.state();
        state.calls.push(call);
        match &state.action_error {
            Some((status, message)) => Err(AppError::panel(*status, message.clone())),
            None => Ok(()),
        }
    }
}

fn panel_server(id: i64, name: &str, external_id: &str) -> PanelServer {
    PanelServer {
        id,
        uuid: format!("0000-{}", id),
        identifier: format!("ident{}", id),
        name: name.to_string(),
        external_id: Some(external_id.to_string()),
        internal_id: Some(id),
        suspended: false,
    }
}

impl PanelApi for FakePanel {
    async fn find_user_by_email(&self, email: &str) -> Res<Option<PanelUser>> {
        let mut state = self.state();
        state.calls.push(PanelCall::FindUserByEmail(email.to_string()));
        Ok(state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user(&self, user: &NewPanelUser) -> Res<PanelUser> {
        let mut state = self.state();
        state.calls.push(PanelCall::CreateUser(user.clone()));
        let id = Self::next_id(&mut state);
        let created = PanelUser {
            id,
            uuid: format!("panel-user-{}", id),
            username: user.username.clone(),
            email: user.email.clone(),
            external_id: user.external_id.clone(),
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn find_server_by_external_id(&self, external_id: &str) -> Res<Option<PanelServer>> {
        let mut state = self.state();
        state
            .calls
            .push(PanelCall::FindServerByExternalId(external_id.to_string()));
        Ok(state.servers.get(external_id).cloned())
    }

    async fn create_server(&self, server: &NewPanelServer) -> Res<PanelServer> {
        let mut state = self.state();
        state.calls.push(PanelCall::CreateServer(server.clone()));
        if let Some((status, message)) = &state.create_server_error {
            return Err(AppError::panel(*status, message.clone()));
        }
        let id = Self::next_id(&mut state);
        let created = panel_server(id, &server.name, &server.external_id);
        state
            .servers
            .insert(server.external_id.clone(), created.clone());
        Ok(created)
    }

    async fn suspend_server(&self, id: i64) -> Res<()> {
        self.action(PanelCall::Suspend(id))
    }

    async fn unsuspend_server(&self, id: i64) -> Res<()> {
        self.action(PanelCall::Unsuspend(id))
    }

    async fn delete_server(&self, id: i64, force: bool) -> Res<()> {
        self.action(PanelCall::Delete { id, force })?;
        self.state().servers.retain(|_, s| s.id != id);
        Ok(())
    }
}
