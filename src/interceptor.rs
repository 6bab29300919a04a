//! Method interception over explicitly declared member maps.
//!
//! An [`Object`] is a named map of members. Each member is either a method
//! (an async callable taking a [`Receiver`] and an argument value) or a plain
//! JSON value. A [`MethodInterceptor`] replaces every method member with one
//! that routes the call through a wrapper function first; value members are
//! left alone.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use dispatchkit::interceptor::{MethodInterceptor, Object};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let obj = Object::<i32, i32>::new("math")
//!     .with_method("double", |_recv, n| async move { n * 2 });
//!
//! // The wrapper decides how (and whether) to call the original method.
//! let interceptor: MethodInterceptor<(), i32, i32> = MethodInterceptor::new(
//!     |_ctx, original, recv, n| Box::pin(async move { original(recv, n).await + 1 }),
//!     None,
//! );
//!
//! let obj = interceptor.intercept(obj);
//! assert_eq!(obj.call("double", 20).unwrap().await, 41);
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

/// Boxed future for method results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased method member.
pub type Method<A, O> = Arc<dyn Fn(Receiver, A) -> BoxFuture<'static, O> + Send + Sync>;

/// Wrapper callback: `(context, original, receiver, args)`.
pub type WrapperFn<C, A, O> =
    Arc<dyn Fn(Option<Arc<C>>, Method<A, O>, Receiver, A) -> BoxFuture<'static, O> + Send + Sync>;

/// Call-time receiver of a method: which object and which member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Receiver {
    object: Arc<str>,
    member: Arc<str>,
}

impl Receiver {
    pub fn new(object: impl Into<Arc<str>>, member: impl Into<Arc<str>>) -> Self {
        Self {
            object: object.into(),
            member: member.into(),
        }
    }

    /// Name of the object the method was called on.
    #[inline]
    pub fn object(&self) -> &str {
        &self.object
    }

    /// Name of the member being called.
    #[inline]
    pub fn member(&self) -> &str {
        &self.member
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.member)
    }
}

/// A member of an [`Object`].
pub enum Member<A, O> {
    /// Callable member; the only kind that gets intercepted.
    Method(Method<A, O>),
    /// Plain data member, never wrapped.
    Value(Value),
}

impl<A, O> Member<A, O> {
    pub fn is_method(&self) -> bool {
        matches!(self, Member::Method(_))
    }

    pub fn as_method(&self) -> Option<&Method<A, O>> {
        match self {
            Member::Method(m) => Some(m),
            Member::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Member::Method(_) => None,
            Member::Value(v) => Some(v),
        }
    }
}

impl<A, O> Clone for Member<A, O> {
    fn clone(&self) -> Self {
        match self {
            Member::Method(m) => Member::Method(m.clone()),
            Member::Value(v) => Member::Value(v.clone()),
        }
    }
}

impl<A, O> fmt::Debug for Member<A, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method(_) => f.write_str("Method(..)"),
            Member::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// Named map of members.
pub struct Object<A, O> {
    name: Arc<str>,
    members: BTreeMap<String, Member<A, O>>,
}

impl<A, O> Object<A, O>
where
    A: Send + 'static,
    O: Send + 'static,
{
    /// Create an empty object.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            members: BTreeMap::new(),
        }
    }

    /// Add a method member (builder style).
    pub fn with_method<F, Fut>(mut self, name: &str, method: F) -> Self
    where
        F: Fn(Receiver, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        self.insert_method(name, method);
        self
    }

    /// Add a value member (builder style).
    pub fn with_value(mut self, name: &str, value: Value) -> Self {
        self.members.insert(name.to_string(), Member::Value(value));
        self
    }

    /// Insert or replace a method member.
    pub fn insert_method<F, Fut>(&mut self, name: &str, method: F)
    where
        F: Fn(Receiver, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        let method: Method<A, O> =
            Arc::new(move |recv: Receiver, args: A| -> BoxFuture<'static, O> {
                Box::pin(method(recv, args))
            });
        self.members.insert(name.to_string(), Member::Method(method));
    }

    /// Insert or replace a member as-is.
    pub fn insert(&mut self, name: &str, member: Member<A, O>) {
        self.members.insert(name.to_string(), member);
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Member<A, O>> {
        self.members.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&Method<A, O>> {
        self.members.get(name).and_then(Member::as_method)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.members.get(name).and_then(Member::as_value)
    }

    /// Member names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Build the receiver for a member of this object.
    pub fn receiver(&self, member: &str) -> Receiver {
        Receiver::new(self.name.clone(), member)
    }

    /// Call a method member. Returns `None` if no such method exists.
    pub fn call(&self, member: &str, args: A) -> Option<BoxFuture<'static, O>> {
        let method = self.method(member)?;
        Some(method(self.receiver(member), args))
    }
}

impl<A, O> Clone for Object<A, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            members: self.members.clone(),
        }
    }
}

impl<A, O> fmt::Debug for Object<A, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("members", &self.members)
            .finish()
    }
}

/// Wraps every method member of an [`Object`] with a wrapper function.
///
/// Intercepting the same object twice nests the wrappers; register each
/// object exactly once.
pub struct MethodInterceptor<C, A, O> {
    wrapper: WrapperFn<C, A, O>,
    context: Option<Arc<C>>,
}

impl<C, A, O> MethodInterceptor<C, A, O>
where
    C: Send + Sync + 'static,
    A: Send + 'static,
    O: Send + 'static,
{
    /// Create an interceptor from a wrapper and an optional context.
    ///
    /// The wrapper does not call the original method on its own behalf;
    /// it must invoke `original(receiver, args)` itself.
    pub fn new<F>(wrapper: F, context: Option<Arc<C>>) -> Self
    where
        F: Fn(Option<Arc<C>>, Method<A, O>, Receiver, A) -> BoxFuture<'static, O>
            + Send
            + Sync
            + 'static,
    {
        Self {
            wrapper: Arc::new(wrapper),
            context,
        }
    }

    /// The context handed to the wrapper on every call.
    pub fn context(&self) -> Option<&Arc<C>> {
        self.context.as_ref()
    }

    /// Replace every method member of `obj` with a wrapped version.
    pub fn intercept(&self, mut obj: Object<A, O>) -> Object<A, O> {
        for member in obj.members.values_mut() {
            let Member::Method(original) = member else {
                continue;
            };

            let original = original.clone();
            let wrapper = self.wrapper.clone();
            let context = self.context.clone();

            let wrapped: Method<A, O> = Arc::new(move |recv: Receiver, args: A| {
                wrapper(context.clone(), original.clone(), recv, args)
            });
            *member = Member::Method(wrapped);
        }

        obj
    }
}

impl<C, A, O> Clone for MethodInterceptor<C, A, O> {
    fn clone(&self) -> Self {
        Self {
            wrapper: self.wrapper.clone(),
            context: self.context.clone(),
        }
    }
}
