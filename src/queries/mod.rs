pub mod ddl;
pub mod history;
pub mod memberships;
pub mod metadata;
pub mod removals;
pub mod segments;
