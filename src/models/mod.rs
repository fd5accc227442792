pub mod build;
pub mod github;
pub mod service;

pub use build::{Build, RawBuild};
pub use github::{Commit, GithubCommit, GithubRepo};
pub use service::{
    Ci, CiBackend, CiDescriptor, Repo, RepoBackend, RepoDescriptor, RepoInfo, Service,
    ServiceDescriptor, ServiceState,
};
