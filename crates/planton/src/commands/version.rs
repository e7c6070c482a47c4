use crate::upgrade::version;

pub fn handle() {
    println!("project-planton {}", version::current());
    tracing::debug!(crate_version = env!("CARGO_PKG_VERSION"), "Build info");
}
