/// A capability set that can hand out the service `S`.
///
/// Every service trivially provides itself, so a runtime built around a single
/// service needs no wrapper type. Larger applications implement this once per
/// service on their own capability struct:
///
/// ```rust
/// use effect_rpc::effect::Provides;
///
/// #[derive(Clone)]
/// struct Mailer;
///
/// struct Services {
///     mailer: Mailer,
/// }
///
/// impl Provides<Mailer> for Services {
///     fn provide(&self) -> &Mailer {
///         &self.mailer
///     }
/// }
/// ```
pub trait Provides<S>: Send + Sync + 'static {
    fn provide(&self) -> &S;
}

impl<S: Send + Sync + 'static> Provides<S> for S {
    fn provide(&self) -> &S {
        self
    }
}
