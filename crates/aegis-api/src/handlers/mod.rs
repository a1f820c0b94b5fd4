// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! HTTP handlers.

mod health;
mod jobs;
mod operators;
mod privilege;

pub use health::health;
pub use jobs::{claim_job, create_ping_job, get_job, pending_jobs, update_job};
pub use operators::{
    inactive_operators, list_operators, list_servers, mark_server_inactive, operator_heartbeat,
    register_operator, register_server,
};
pub use privilege::{
    active_grants, approve_request, pending_requests, revoke_grant, submit_request,
};
