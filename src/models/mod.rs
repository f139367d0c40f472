pub mod component;
pub mod portfolio;
pub mod portfolio_project;
pub mod portfolio_project_branch;
pub mod portfolio_reference;
pub mod project_branch;
