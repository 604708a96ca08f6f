//! Callables taking two or more arguments.
//!
//! A cache instance is identified by the signature of the callable it serves,
//! expressed as a function-pointer type such as `fn(u32, u32) -> u64`.
//! Unary callables use `fn(A) -> R` directly; this module gives callables of
//! higher arity the same kind of signature, plus a way to call them with
//! their arguments packed in a tuple, which doubles as the cache key.

use std::marker::PhantomData;

mod sealed {
    pub trait Sealed<Args> {}
}

/// A callable of arity two or more, called with its arguments as a tuple.
///
/// Implemented for every `Fn` of arity two to eight and for nothing else, so
/// a signature always determines the key and result types of its instance.
///
/// ```compile_fail
/// use callcache::MultiArgFn;
///
/// struct Len;
///
/// impl MultiArgFn<String> for Len {
///     type Output = u32;
///     type Signature = fn(u32) -> u32;
///
///     fn call_with(&self, args: String) -> u32 {
///         args.len() as u32
///     }
/// }
/// ```
pub trait MultiArgFn<Args>: sealed::Sealed<Args> {
    type Output;
    /// The function-pointer type naming this callable's signature.
    type Signature: 'static;

    fn call_with(&self, args: Args) -> Self::Output;
}

macro_rules! impl_multi_arg_fn {
    ($($T:ident $arg:ident),+) => {
        impl<Func, Ret, $($T),+> sealed::Sealed<($($T,)+)> for Func
        where
            Func: Fn($($T),+) -> Ret,
        {
        }

        impl<Func, Ret, $($T),+> MultiArgFn<($($T,)+)> for Func
        where
            Func: Fn($($T),+) -> Ret,
            Ret: 'static,
            $($T: 'static),+
        {
            type Output = Ret;
            type Signature = fn($($T),+) -> Ret;

            fn call_with(&self, ($($arg,)+): ($($T,)+)) -> Ret {
                self($($arg),+)
            }
        }
    };
}

impl_multi_arg_fn!(A a, B b);
impl_multi_arg_fn!(A a, B b, C c);
impl_multi_arg_fn!(A a, B b, C c, D d);
impl_multi_arg_fn!(A a, B b, C c, D d, E e);
impl_multi_arg_fn!(A a, B b, C c, D d, E e, F f);
impl_multi_arg_fn!(A a, B b, C c, D d, E e, F f, G g);
impl_multi_arg_fn!(A a, B b, C c, D d, E e, F f, G g, H h);

/// Names the instance holding the `Ok` values of a callable with signature
/// `S`, which returns `Result`. It is kept apart from the instance of `S`
/// itself, where whole `Result`s are stored.
pub struct Fallible<S>(PhantomData<S>);

/// Readable name of a signature, used in log lines and errors.
pub fn signature_name<S: 'static>() -> &'static str {
    std::any::type_name::<S>()
}
