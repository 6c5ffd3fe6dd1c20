//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod absence_type;
pub mod leave_allowance;
pub mod leave_request;

// Re-export specific types to avoid conflicts
pub use absence_type::{
    Column as AbsenceTypeColumn, Entity as AbsenceType, Model as AbsenceTypeModel,
};
pub use leave_allowance::{
    Column as LeaveAllowanceColumn, Entity as LeaveAllowance, Model as LeaveAllowanceModel,
};
pub use leave_request::{
    Column as LeaveRequestColumn, Entity as LeaveRequest, LeaveStatus, Model as LeaveRequestModel,
};
