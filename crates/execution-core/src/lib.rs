//! Core execution types and utilities.
//!
//! This crate provides the pieces that turn an approved decision into an
//! exchange order and track what it left behind:
//!
//! - **Order types**: `Order`, `OrderSide`
//! - **Positions**: `PositionManager` holding one live `Position` per symbol
//! - **Transports**: `OrderTransport` with HTTP and paper implementations
//! - **Executor**: `OrderExecutor` with fixed-interval throttling and bounded retry
//!
//! # Order Lifecycle
//!
//! 1. The trading loop builds an `Order` from an allowed risk decision
//! 2. `OrderExecutor::execute` waits out the throttle and submits it
//! 3. Transport errors are retried up to `max_retries`, spaced by the throttle
//! 4. The first acknowledgement is returned; exhausted retries surface as an error
//! 5. Only an acknowledged order updates the `PositionManager`

mod error;
mod execution;
mod order;
mod position;
mod transport;

pub use error::{ExecutionError, TransportError};
pub use execution::{ExecutorConfig, OrderExecutor, Submission};
pub use order::{generate_client_order_id, Order, OrderSide};
pub use position::{
    create_position_manager, Position, PositionManager, PositionSide, SharedPositionManager,
};
pub use transport::{HttpOrderTransport, OrderTransport, PaperTransport, SharedTransport};
