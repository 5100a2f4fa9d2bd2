//! Convenience macros for extension development.

/// Exports the creation symbol a dynamic extension library needs.
///
/// The expression is evaluated on every load and must produce a type
/// implementing [`Extension`](crate::Extension).
///
/// # Example
/// ```rust,ignore
/// #[derive(Debug, Default)]
/// struct Analytics;
///
/// #[async_trait::async_trait]
/// impl plughost_runtime::Extension for Analytics {}
///
/// plughost_runtime::export_extension!(Analytics::default());
/// ```
#[macro_export]
macro_rules! export_extension {
    ($ctor:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn plughost_create_extension()
        -> *mut ::std::boxed::Box<dyn $crate::Extension> {
            let instance: ::std::boxed::Box<dyn $crate::Extension> = ::std::boxed::Box::new($ctor);
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(instance))
        }
    };
}

/// Builds a `Vec<Capability>` from `kind => path` pairs.
///
/// # Example
/// ```rust,ignore
/// let caps = capabilities![
///     route => "/oauth/callback",
///     component => "components/OAuthButtons.jsx",
/// ];
/// ```
#[macro_export]
macro_rules! capabilities {
    (@one page => $path:expr) => {
        $crate::Capability::Page { path: $path.to_string() }
    };
    (@one component => $path:expr) => {
        $crate::Capability::component($path)
    };
    (@one route => $path:expr) => {
        $crate::Capability::Route { path: $path.to_string() }
    };
    (@one admin => $path:expr) => {
        $crate::Capability::AdminPage { path: $path.to_string() }
    };
    (@one widget => $path:expr) => {
        $crate::Capability::Widget { path: $path.to_string() }
    };
    (@one layout => $path:expr) => {
        $crate::Capability::layout($path)
    };
    ($($kind:ident => $path:expr),* $(,)?) => {
        vec![$($crate::capabilities!(@one $kind => $path)),*]
    };
}

#[cfg(test)]
mod tests {
    use crate::Capability;

    #[derive(Debug)]
    struct Exported;

    #[async_trait::async_trait]
    impl crate::Extension for Exported {
        async fn activate(&self) -> Result<(), String> {
            Err("exported".to_string())
        }
    }

    crate::export_extension!(Exported);

    #[tokio::test]
    async fn test_exported_creation_symbol() {
        let raw = plughost_create_extension();
        assert!(!raw.is_null());
        // SAFETY: produced by `Box::into_raw` just above.
        let instance = unsafe { Box::from_raw(raw) };
        assert_eq!(instance.activate().await, Err("exported".to_string()));
    }

    #[test]
    fn test_capabilities_macro() {
        let caps = crate::capabilities![
            route => "/oauth/callback",
            component => "components/OAuthButtons.jsx",
            layout => "layouts/default.tsx",
        ];
        assert_eq!(caps.len(), 3);
        assert_eq!(caps[0], Capability::Route { path: "/oauth/callback".to_string() });
        assert_eq!(caps[2].label(), "layout");
    }
}
