//! Provider specifications.
//!
//! A [`Provider`] pairs a [`Token`] with a [`Supplier`]. Suppliers are either a
//! ready-made value or a constructor that is run once per injector, after the
//! tokens it declares as dependencies have been initialized.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::injector::Injector;
use crate::token::Token;

/// Type-erased singleton held by an injector.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Constructor = Arc<dyn Fn(&Dependencies<'_>) -> Result<Instance> + Send + Sync>;

/// Read access to already-initialized dependencies during construction.
pub struct Dependencies<'a> {
    injector: &'a Injector,
}

impl<'a> Dependencies<'a> {
    pub(crate) fn new(injector: &'a Injector) -> Self {
        Self { injector }
    }

    /// Typed dependency lookup by token.
    pub fn get<T: Any + Send + Sync>(&self, token: &Token) -> Result<Arc<T>> {
        self.injector.get(token)
    }

    /// Typed dependency lookup by type token.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.injector.get(&Token::of::<T>())
    }

    /// Untyped dependency lookup.
    pub fn instance(&self, token: &Token) -> Result<Instance> {
        self.injector.get_instance(token)
    }
}

/// A type the injector knows how to build.
///
/// ```ignore
/// struct PostStore { db: Arc<Database> }
///
/// impl Injectable for PostStore {
///     fn dependencies() -> Vec<Token> {
///         vec![Token::of::<Database>()]
///     }
///
///     fn construct(deps: &Dependencies<'_>) -> gqlmod_di::Result<Self> {
///         Ok(Self { db: deps.resolve::<Database>()? })
///     }
/// }
/// ```
pub trait Injectable: Any + Send + Sync + Sized {
    /// Tokens that must be initialized before [`Injectable::construct`] runs.
    fn dependencies() -> Vec<Token> {
        Vec::new()
    }

    /// Builds the instance from its dependencies.
    fn construct(deps: &Dependencies<'_>) -> Result<Self>;
}

/// How a provider produces its instance.
#[derive(Clone)]
pub enum Supplier {
    /// A literal value, shared as-is.
    Value(Instance),
    /// A constructor invoked once per injector.
    Factory {
        dependencies: Vec<Token>,
        construct: Constructor,
    },
}

/// Token plus supplier.
#[derive(Clone)]
pub struct Provider {
    token: Token,
    supplier: Supplier,
}

impl Provider {
    /// Binds `token` to a literal value.
    pub fn value<T: Any + Send + Sync>(token: Token, value: T) -> Self {
        Self {
            token,
            supplier: Supplier::Value(Arc::new(value)),
        }
    }

    /// Binds `token` to an already shared value.
    pub fn instance(token: Token, instance: Instance) -> Self {
        Self {
            token,
            supplier: Supplier::Value(instance),
        }
    }

    /// Class provider: `T` is constructed under its own type token.
    pub fn class<T: Injectable>() -> Self {
        Self::class_as::<T>(Token::of::<T>())
    }

    /// Class provider registered under an arbitrary token.
    pub fn class_as<T: Injectable>(token: Token) -> Self {
        Self {
            token,
            supplier: Supplier::Factory {
                dependencies: T::dependencies(),
                construct: Arc::new(|deps: &Dependencies<'_>| {
                    Ok(Arc::new(T::construct(deps)?) as Instance)
                }),
            },
        }
    }

    /// Provider backed by a closure.
    pub fn factory<T, F>(token: Token, dependencies: Vec<Token>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Dependencies<'_>) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            token,
            supplier: Supplier::Factory {
                dependencies,
                construct: Arc::new(move |deps: &Dependencies<'_>| {
                    Ok(Arc::new(factory(deps)?) as Instance)
                }),
            },
        }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn supplier(&self) -> &Supplier {
        &self.supplier
    }

    /// Tokens this provider needs; empty for values.
    pub fn dependencies(&self) -> &[Token] {
        match &self.supplier {
            Supplier::Value(_) => &[],
            Supplier::Factory { dependencies, .. } => dependencies,
        }
    }

    pub(crate) fn produce(&self, deps: &Dependencies<'_>) -> Result<Instance> {
        match &self.supplier {
            Supplier::Value(instance) => Ok(Arc::clone(instance)),
            Supplier::Factory { construct, .. } => construct(deps),
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.supplier {
            Supplier::Value(_) => "value",
            Supplier::Factory { .. } => "factory",
        };
        f.debug_struct("Provider")
            .field("token", &self.token)
            .field("kind", &kind)
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock;

    impl Injectable for Clock {
        fn construct(_deps: &Dependencies<'_>) -> Result<Self> {
            Ok(Clock)
        }
    }

    #[test]
    fn test_class_provider_uses_type_token() {
        let provider = Provider::class::<Clock>();
        assert_eq!(provider.token(), &Token::of::<Clock>());
        assert!(provider.dependencies().is_empty());
        assert!(matches!(provider.supplier(), Supplier::Factory { .. }));
    }

    #[test]
    fn test_factory_keeps_declared_dependencies() {
        let provider = Provider::factory(
            Token::named("greeting"),
            vec![Token::module_config("users")],
            |_| Ok("hello".to_string()),
        );
        assert_eq!(provider.dependencies(), &[Token::module_config("users")]);
    }

    #[test]
    fn test_debug_names_kind() {
        let provider = Provider::value(Token::named("limit"), 10_u32);
        let debug = format!("{provider:?}");
        assert!(debug.contains("value"));
        assert!(debug.contains("limit"));
    }
}
