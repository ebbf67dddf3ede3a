//! Generated gRPC types and client stub for the agent/control-plane channel.
//!
//! Everything here is produced by `tonic-build` from `proto/agent_endpoint.proto`;
//! this crate exists only to own that codegen and re-export it under a stable
//! path for `taskagent-engine` and `taskagent-daemon`.

#![allow(clippy::all)]

tonic::include_proto!("taskagent.v1");

pub use agent_endpoint_service_client::AgentEndpointServiceClient;
