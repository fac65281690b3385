//! Façade generation for declared repository traits.

/// Declares the façade for a repository trait.
///
/// ```ignore
/// pub trait NoteRepository: Send + Sync {
///     fn find_by_id(&self, id: i64) -> Result<Note, NoteError>;
/// }
///
/// repository_facade! {
///     pub struct NoteRepositoryFacade: NoteRepository => SqliteNoteRepository {
///         fn find_by_id(&self, id: i64) -> Result<Note, NoteError>;
///     }
/// }
/// ```
///
/// The generated struct implements the trait by forwarding each method through
/// a [`Redirect`](crate::dispatch::Redirect) to the delegate, and implements
/// [`RepositoryDeclaration`](crate::dispatch::RepositoryDeclaration) for every
/// handle type the delegate supports through
/// [`SqlObject`](crate::dispatch::SqlObject).
///
/// The trait must have `Send + Sync` supertraits. Methods take `&self`, have no
/// generic parameters, and return `Result<T, E>` with
/// `E: Display + From<UnitError>` so an interceptor's `around` failure can be
/// reported through the method. Every method of the trait must be listed.
#[macro_export]
macro_rules! repository_facade {
    (
        $(#[$meta:meta])*
        $vis:vis struct $facade:ident: $api:ident => $delegate:ty {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident(&self $(, $arg:ident: $arg_ty:ty)*) -> $ret:ty;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis struct $facade {
            redirect: $crate::dispatch::Redirect<dyn $api>,
        }

        impl $api for $facade {
            $(
                $(#[$method_meta])*
                fn $method(&self $(, $arg: $arg_ty)*) -> $ret {
                    self.redirect.invoke(stringify!($method), move |delegate| {
                        delegate.$method($($arg),*)
                    })
                }
            )*
        }

        impl<H> $crate::dispatch::RepositoryDeclaration<H> for $facade
        where
            H: 'static,
            $delegate: $crate::dispatch::SqlObject<H> + $api + 'static,
        {
            type Api = dyn $api;

            fn repository_name() -> &'static str {
                stringify!($api)
            }

            fn delegate(
                resolver: $crate::unit::SharedResolver<H>,
            ) -> ::std::sync::Arc<dyn $api> {
                let delegate: ::std::sync::Arc<dyn $api> = ::std::sync::Arc::new(
                    <$delegate as $crate::dispatch::SqlObject<H>>::attach(resolver),
                );
                delegate
            }

            fn facade(
                redirect: $crate::dispatch::Redirect<dyn $api>,
            ) -> ::std::sync::Arc<dyn $api> {
                let facade: ::std::sync::Arc<dyn $api> =
                    ::std::sync::Arc::new($facade { redirect });
                facade
            }
        }

        impl ::std::fmt::Debug for $facade {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($facade))
                    .field("redirect", &self.redirect)
                    .finish()
            }
        }
    };
}
