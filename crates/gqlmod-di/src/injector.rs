//! Singleton container keyed by [`Token`].
//!
//! An injector owns a set of bindings and the instances built from them.
//! Instances are memoized for the lifetime of the injector only; building a new
//! injector from the same providers produces new singletons.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::error::{InjectorError, Result};
use crate::provider::{Dependencies, Instance, Provider};
use crate::strategy::MergeStrategy;
use crate::token::Token;

/// Token-keyed singleton container.
#[derive(Default)]
pub struct Injector {
    bindings: IndexMap<Token, Provider>,
    instances: HashMap<Token, Instance>,
}

impl Injector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a binding, replacing any previous binding for the same token.
    ///
    /// A replaced binding's singleton is dropped so that the next
    /// [`init`](Self::init) builds it from the new supplier. Returns the
    /// replaced provider, if any.
    pub fn provide(&mut self, provider: Provider) -> Option<Provider> {
        let token = provider.token().clone();
        let previous = self.bindings.insert(token.clone(), provider);
        if previous.is_some() {
            self.instances.remove(&token);
            trace!(token = %token, "Replaced provider binding");
        }
        previous
    }

    /// Builds the singleton for `token` unless it already exists.
    ///
    /// Declared dependencies are initialized first, from this same injector.
    ///
    /// # Errors
    ///
    /// - `MissingProvider` if `token` or one of its dependencies is unbound.
    /// - `CyclicDependency` if the dependency chain loops back on itself.
    /// - Whatever the supplier itself returns.
    pub fn init(&mut self, token: &Token) -> Result<Instance> {
        let mut stack = Vec::new();
        self.init_with_stack(token, &mut stack)
    }

    /// Initializes every bound token in registration order.
    pub fn init_all(&mut self) -> Result<()> {
        let tokens: Vec<Token> = self.bindings.keys().cloned().collect();
        for token in &tokens {
            self.init(token)?;
        }
        Ok(())
    }

    fn init_with_stack(&mut self, token: &Token, stack: &mut Vec<Token>) -> Result<Instance> {
        if let Some(instance) = self.instances.get(token) {
            return Ok(Arc::clone(instance));
        }

        if stack.contains(token) {
            let mut path = stack.clone();
            path.push(token.clone());
            return Err(InjectorError::CyclicDependency { path });
        }

        let provider = self
            .bindings
            .get(token)
            .cloned()
            .ok_or_else(|| InjectorError::missing_provider(token.clone()))?;

        stack.push(token.clone());
        for dependency in provider.dependencies() {
            self.init_with_stack(dependency, stack)?;
        }
        stack.pop();

        let instance = provider.produce(&Dependencies::new(self))?;
        debug!(token = %token, "Initialized provider");
        self.instances.insert(token.clone(), Arc::clone(&instance));
        Ok(instance)
    }

    /// Returns the singleton for `token` without initializing it.
    ///
    /// # Errors
    ///
    /// `MissingProvider` if the token was never registered, `Uninitialized`
    /// if it was registered but not yet built.
    pub fn get_instance(&self, token: &Token) -> Result<Instance> {
        if let Some(instance) = self.instances.get(token) {
            return Ok(Arc::clone(instance));
        }
        if self.bindings.contains_key(token) {
            Err(InjectorError::Uninitialized {
                token: token.clone(),
            })
        } else {
            Err(InjectorError::missing_provider(token.clone()))
        }
    }

    /// Typed variant of [`get_instance`](Self::get_instance).
    pub fn get<T: Any + Send + Sync>(&self, token: &Token) -> Result<Arc<T>> {
        self.get_instance(token)?
            .downcast::<T>()
            .map_err(|_| InjectorError::TypeMismatch {
                token: token.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Looks `T` up under its type token.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.get(&Token::of::<T>())
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.bindings.contains_key(token)
    }

    pub fn is_initialized(&self, token: &Token) -> bool {
        self.instances.contains_key(token)
    }

    /// Bound tokens in registration order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.bindings.keys()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("bindings", &self.bindings.len())
            .field("initialized", &self.instances.len())
            .finish()
    }
}

/// Registers `providers` in order and eagerly initializes each of them.
///
/// Duplicate tokens are handled according to `strategy`: the later provider
/// replaces the earlier one unless the strategy is `Strict`.
///
/// # Errors
///
/// `DuplicateProvider` under `Strict`, or any initialization error.
pub fn build_injector(providers: &[Provider], strategy: MergeStrategy) -> Result<Injector> {
    let mut injector = Injector::new();

    for provider in providers {
        if injector.contains(provider.token()) {
            match strategy {
                MergeStrategy::Strict => {
                    return Err(InjectorError::DuplicateProvider {
                        token: provider.token().clone(),
                    });
                }
                MergeStrategy::Warn => {
                    warn!(token = %provider.token(), "Duplicate provider, last registration wins");
                }
                MergeStrategy::Override => {}
            }
        }
        injector.provide(provider.clone());
    }

    // Initialize after all bindings are in place so a provider may depend on
    // one registered later in the list.
    injector.init_all()?;

    debug!(providers = injector.len(), "Injector built");
    Ok(injector)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::provider::Injectable;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` with a subscriber that records formatted events.
    fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let output = String::from_utf8_lossy(&logs.0.lock().unwrap()).into_owned();
        (result, output)
    }

    struct Database {
        url: String,
    }

    impl Injectable for Database {
        fn dependencies() -> Vec<Token> {
            vec![Token::named("db-url")]
        }

        fn construct(deps: &Dependencies<'_>) -> Result<Self> {
            let url = deps.get::<String>(&Token::named("db-url"))?;
            Ok(Self {
                url: url.as_ref().clone(),
            })
        }
    }

    struct PostStore {
        db: Arc<Database>,
    }

    impl Injectable for PostStore {
        fn dependencies() -> Vec<Token> {
            vec![Token::of::<Database>()]
        }

        fn construct(deps: &Dependencies<'_>) -> Result<Self> {
            Ok(Self {
                db: deps.resolve::<Database>()?,
            })
        }
    }

    #[test]
    fn test_get_unregistered_token() {
        let injector = Injector::new();
        let err = injector.get_instance(&Token::named("nope")).unwrap_err();
        assert!(matches!(err, InjectorError::MissingProvider { .. }));
    }

    #[test]
    fn test_get_before_init() {
        let mut injector = Injector::new();
        injector.provide(Provider::value(Token::named("n"), 1_u8));
        let err = injector.get::<u8>(&Token::named("n")).unwrap_err();
        assert!(matches!(err, InjectorError::Uninitialized { .. }));
    }

    #[test]
    fn test_init_then_get_returns_same_instance() {
        let mut injector = Injector::new();
        injector.provide(Provider::value(Token::named("db-url"), "postgres://".to_string()));
        injector.provide(Provider::class::<Database>());
        injector.init(&Token::of::<Database>()).unwrap();

        let first = injector.resolve::<Database>().unwrap();
        let second = injector.resolve::<Database>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.url, "postgres://");
    }

    #[test]
    fn test_init_resolves_dependencies_recursively() {
        let mut injector = Injector::new();
        injector.provide(Provider::class::<PostStore>());
        injector.provide(Provider::class::<Database>());
        injector.provide(Provider::value(Token::named("db-url"), "sqlite://".to_string()));

        injector.init(&Token::of::<PostStore>()).unwrap();

        assert!(injector.is_initialized(&Token::of::<Database>()));
        let store = injector.resolve::<PostStore>().unwrap();
        let db = injector.resolve::<Database>().unwrap();
        assert!(Arc::ptr_eq(&store.db, &db));
    }

    #[test]
    fn test_rebinding_replaces_singleton() {
        let mut injector = Injector::new();
        let token = Token::named("greeting");
        injector.provide(Provider::value(token.clone(), "hello".to_string()));
        injector.init(&token).unwrap();
        let before = injector.get::<String>(&token).unwrap();

        injector.provide(Provider::value(token.clone(), "bonjour".to_string()));
        injector.init(&token).unwrap();
        let after = injector.get::<String>(&token).unwrap();

        assert_eq!(before.as_str(), "hello");
        assert_eq!(after.as_str(), "bonjour");
    }

    #[test]
    fn test_missing_dependency() {
        let mut injector = Injector::new();
        injector.provide(Provider::class::<Database>());
        let err = injector.init(&Token::of::<Database>()).unwrap_err();
        assert!(
            matches!(err, InjectorError::MissingProvider { ref token } if *token == Token::named("db-url"))
        );
    }

    #[test]
    fn test_dependency_cycle_is_reported() {
        let mut injector = Injector::new();
        injector.provide(Provider::factory(Token::named("a"), vec![Token::named("b")], |_| Ok(1)));
        injector.provide(Provider::factory(Token::named("b"), vec![Token::named("a")], |_| Ok(2)));

        let err = injector.init(&Token::named("a")).unwrap_err();
        match err {
            InjectorError::CyclicDependency { path } => {
                assert_eq!(path, vec![Token::named("a"), Token::named("b"), Token::named("a")]);
            }
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn test_type_mismatch() {
        let mut injector = Injector::new();
        injector.provide(Provider::value(Token::named("port"), 8080_u16));
        injector.init_all().unwrap();
        let err = injector.get::<String>(&Token::named("port")).unwrap_err();
        assert!(matches!(err, InjectorError::TypeMismatch { .. }));
    }

    #[test]
    fn test_build_injector_last_write_wins() {
        let providers = vec![
            Provider::value(Token::named("mode"), "first"),
            Provider::value(Token::named("mode"), "second"),
        ];
        let injector = build_injector(&providers, MergeStrategy::Override).unwrap();
        assert_eq!(*injector.get::<&'static str>(&Token::named("mode")).unwrap(), "second");

        let injector = build_injector(&providers, MergeStrategy::Warn).unwrap();
        assert_eq!(*injector.get::<&'static str>(&Token::named("mode")).unwrap(), "second");
    }

    #[test]
    fn test_build_injector_warn_logs_duplicates() {
        let providers = vec![
            Provider::value(Token::named("mode"), "first"),
            Provider::value(Token::named("mode"), "second"),
        ];

        let (injector, logs) = capture_logs(|| build_injector(&providers, MergeStrategy::Warn));
        assert!(injector.is_ok());
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("Duplicate provider, last registration wins"), "{logs}");
        assert!(logs.contains("token=mode"), "{logs}");

        let (_, logs) = capture_logs(|| build_injector(&providers, MergeStrategy::Override));
        assert!(!logs.contains("Duplicate provider"), "{logs}");
    }

    #[test]
    fn test_build_injector_strict_rejects_duplicates() {
        let providers = vec![
            Provider::value(Token::named("mode"), 1_i32),
            Provider::value(Token::named("mode"), 2_i32),
        ];
        let err = build_injector(&providers, MergeStrategy::Strict).unwrap_err();
        assert!(matches!(err, InjectorError::DuplicateProvider { .. }));
    }

    #[test]
    fn test_fresh_injector_fresh_singletons() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let providers = vec![Provider::factory(Token::named("counter"), vec![], move |_| {
            Ok(counter.fetch_add(1, Ordering::SeqCst))
        })];

        let a = build_injector(&providers, MergeStrategy::Override).unwrap();
        let b = build_injector(&providers, MergeStrategy::Override).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let a = a.get::<usize>(&Token::named("counter")).unwrap();
        let b = b.get::<usize>(&Token::named("counter")).unwrap();
        assert_ne!(*a, *b);
    }
}
