//! The login RPC service: every operation the gateway can call.
//!
//! Each method returns a reply carrying a [`StatusCode`]; none of them
//! return `Err`. Failures from the layers below are mapped to codes here,
//! in one place, by [`ToStatus`].

use std::sync::Arc;

use turnstile_admission::{Admission, AdmissionController, AdmissionError, QueueError};
use turnstile_protocol::{
    Call, CommonReply, KickPlayerRequest, LeaveQueueRequest, LoginReply, LoginRequest,
    QueueInfoReply, QueueInfoRequest, ReconnectRequest, RegisterRequest, Reply, StatusCode,
};
use turnstile_session::{AccountError, AccountStore, RandomTokenIssuer, SessionError, TokenIssuer};

/// Maps an error to the status code a client sees.
pub trait ToStatus {
    fn status(&self) -> StatusCode;
}

impl ToStatus for SessionError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidToken => StatusCode::Unauthorized,
            Self::DeviceMismatch(_) => StatusCode::DeviceMismatch,
            Self::NotFound(_) => StatusCode::NotFound,
            Self::AlreadyOnline(_) => StatusCode::AlreadyExists,
            Self::TokenCollision(_) => StatusCode::InternalError,
        }
    }
}

impl ToStatus for QueueError {
    fn status(&self) -> StatusCode {
        match self {
            Self::AlreadyQueued(_) => StatusCode::AlreadyExists,
            Self::NotInQueue(_) => StatusCode::NotFound,
        }
    }
}

impl ToStatus for AdmissionError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Session(e) => e.status(),
            Self::Queue(e) => e.status(),
        }
    }
}

impl ToStatus for AccountError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::Unauthorized,
            Self::AccountExists(_) => StatusCode::AlreadyExists,
            Self::Internal(_) => StatusCode::InternalError,
        }
    }
}

/// The client-facing message for an error. Internal failures are logged
/// and replaced with a generic message.
fn client_message(err: &(impl ToStatus + std::fmt::Display)) -> String {
    if err.status() == StatusCode::InternalError {
        tracing::error!(error = %err, "internal failure");
        "internal error".to_string()
    } else {
        err.to_string()
    }
}

/// Dispatches gateway calls to the account store and the admission
/// controller.
pub struct LoginService<S: AccountStore, T: TokenIssuer = RandomTokenIssuer> {
    accounts: S,
    admission: Arc<AdmissionController<T>>,
}

impl<S: AccountStore, T: TokenIssuer> LoginService<S, T> {
    pub fn new(accounts: S, admission: Arc<AdmissionController<T>>) -> Self {
        Self {
            accounts,
            admission,
        }
    }

    pub fn admission(&self) -> &Arc<AdmissionController<T>> {
        &self.admission
    }

    pub fn accounts(&self) -> &S {
        &self.accounts
    }

    /// Routes one call to its handler.
    pub async fn dispatch(&self, call: Call) -> Reply {
        match call {
            Call::Login(req) => Reply::Login(self.login(req).await),
            Call::Reconnect(req) => Reply::Login(self.reconnect(req).await),
            Call::KickPlayer(req) => Reply::Common(self.kick_player(req).await),
            Call::GetQueueInfo(req) => Reply::QueueInfo(self.get_queue_info(req).await),
            Call::LeaveQueue(req) => Reply::Common(self.leave_queue(req).await),
            Call::Register(req) => Reply::Common(self.register(req).await),
        }
    }

    /// Verifies credentials, then admits or queues the account.
    ///
    /// A queued reply carries the queue ticket in `token` and the 1-based
    /// rank in `queue_position`.
    pub async fn login(&self, req: LoginRequest) -> LoginReply {
        if req.account.is_empty() || req.password.is_empty() {
            return LoginReply::status(
                StatusCode::InvalidArgument,
                "account and password are required",
            );
        }

        let profile = match self.accounts.verify(&req.account, &req.password).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::info!(account = %req.account, error = %e, "login refused");
                return LoginReply::status(e.status(), client_message(&e));
            }
        };

        match self
            .admission
            .admit(&req.account, &req.device_id, profile)
            .await
        {
            Ok(Admission::Admitted(session)) => LoginReply {
                code: StatusCode::Ok,
                message: "login successful".to_string(),
                token: Some(session.token),
                profile: Some(session.profile),
                queue_position: None,
            },
            Ok(Admission::Queued { ticket, position }) => LoginReply {
                code: StatusCode::Ok,
                message: "server is full, you have joined the queue".to_string(),
                token: Some(ticket),
                profile: None,
                queue_position: Some(u32::try_from(position).unwrap_or(u32::MAX)),
            },
            Err(e) => LoginReply::status(e.status(), client_message(&e)),
        }
    }

    /// Re-authenticates by token on the bound device. The token is not
    /// rotated.
    pub async fn reconnect(&self, req: ReconnectRequest) -> LoginReply {
        if req.token.is_empty() {
            return LoginReply::status(StatusCode::InvalidArgument, "token is required");
        }

        match self.admission.reconnect(&req.token, &req.device_id).await {
            Ok(session) => LoginReply {
                code: StatusCode::Ok,
                message: "reconnect successful".to_string(),
                token: Some(session.token),
                profile: Some(session.profile),
                queue_position: None,
            },
            Err(e) => LoginReply::status(e.status(), client_message(&e)),
        }
    }

    /// Removes a player's session. Notifying the player is left to the
    /// messaging layer.
    pub async fn kick_player(&self, req: KickPlayerRequest) -> CommonReply {
        if req.player_id.as_str().is_empty() {
            return CommonReply::new(StatusCode::InvalidArgument, "player_id is required");
        }

        match self.admission.kick(&req.player_id).await {
            Ok(session) => {
                tracing::info!(
                    player_id = %req.player_id,
                    account = %session.account,
                    reason = %req.reason,
                    "player kicked"
                );
                CommonReply::new(StatusCode::Ok, "player kicked")
            }
            Err(e) => CommonReply::new(e.status(), client_message(&e)),
        }
    }

    pub async fn get_queue_info(&self, req: QueueInfoRequest) -> QueueInfoReply {
        if req.token.is_empty() {
            return QueueInfoReply::status(StatusCode::InvalidArgument, "token is required");
        }

        match self.admission.queue_status(&req.token).await {
            Ok(status) => QueueInfoReply {
                code: StatusCode::Ok,
                message: "queue position found".to_string(),
                position: u32::try_from(status.position).unwrap_or(u32::MAX),
                total: u32::try_from(status.total).unwrap_or(u32::MAX),
                estimated_wait_secs: status.estimated_wait.as_secs(),
            },
            Err(e) => QueueInfoReply::status(e.status(), client_message(&e)),
        }
    }

    pub async fn leave_queue(&self, req: LeaveQueueRequest) -> CommonReply {
        if req.token.is_empty() {
            return CommonReply::new(StatusCode::InvalidArgument, "token is required");
        }

        match self.admission.leave_queue(&req.token).await {
            Ok(_) => CommonReply::new(StatusCode::Ok, "left the queue"),
            Err(e) => CommonReply::new(e.status(), client_message(&e)),
        }
    }

    /// Creates an account. Entirely delegated to the account store.
    pub async fn register(&self, req: RegisterRequest) -> CommonReply {
        if req.account.is_empty() || req.password.is_empty() {
            return CommonReply::new(
                StatusCode::InvalidArgument,
                "account and password are required",
            );
        }

        match self.accounts.register(&req).await {
            Ok(()) => CommonReply::new(StatusCode::Ok, "registration successful"),
            Err(e) => CommonReply::new(e.status(), client_message(&e)),
        }
    }
}
