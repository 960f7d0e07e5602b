//! Authentication service models

pub mod invite;
pub mod user;

// Re-export for convenience
pub use invite::{
    Invite, InviteRequest, InviteResponse, InviteState, InviteVerification, SetupPasswordRequest,
};
pub use user::{
    LoginRequest, RegisterRequest, SetActiveRequest, UpdateRoleRequest, User, UserResponse,
};
