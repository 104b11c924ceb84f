//! Disposal trait for tracked instances.

/// Trait for synchronous resource cleanup.
///
/// Instances produced by targets whose type descriptor was marked `tracked`
/// are registered with the active scope and disposed when that scope is
/// disposed, in reverse creation order.
///
/// Disposal panics from user code propagate undisturbed; only the explicitly
/// best-effort helpers swallow them.
///
/// # Examples
///
/// ```
/// use crucible_di::Dispose;
///
/// struct Connection {
///     url: String,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         println!("closing {}", self.url);
///     }
/// }
/// ```
pub trait Dispose: Send + Sync {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
