//! Small utilities shared across the shell.

pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Retries a nix call for as long as it reports EINTR.
pub fn syscall<F, T>(f: F) -> Result<T, nix::Error>
where
    F: Fn() -> Result<T, nix::Error>,
{
    loop {
        match f() {
            Err(nix::Error::EINTR) => (),
            result => return result,
        }
    }
}
