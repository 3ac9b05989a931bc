use proc_macro::TokenStream;
use quote::quote;
use syn::{Expr, ExprLit, ItemFn, Lit, Meta, MetaNameValue};

/// Register a routine factory under an explicit key.
///
/// The function must take no arguments and return a step sequence. It is
/// collected at link time and registered by `SchedulerBuilder::register_all()`.
///
/// # Examples
///
/// ```rust,ignore
/// use tickflow::{routine, steps, Signal};
///
/// #[routine(key = "spawn_wave")]
/// fn spawn_wave() -> impl Iterator<Item = Signal> + Send {
///     (0..10).map(|_| Signal::wait_secs(1.0))
/// }
///
/// #[routine(key = "boss_intro", enabled = "${app.boss_enabled:true}")]
/// fn boss_intro() -> steps::Script {
///     steps::script().run(|| println!("roar")).end()
/// }
/// ```
///
/// # Parameters
///
/// - `key`: task key used to start and stop it (required)
/// - `enabled`: boolean, or a config placeholder resolved when the scheduler is built
#[proc_macro_attribute]
pub fn routine(args: TokenStream, input: TokenStream) -> TokenStream {
    let attr_args = syn::parse_macro_input!(args with syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated);
    let input_fn = syn::parse_macro_input!(input as ItemFn);

    match expand_routine(&attr_args, input_fn) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}

fn expand_routine(
    attr_args: &syn::punctuated::Punctuated<Meta, syn::Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let fn_name = &input_fn.sig.ident;

    if !input_fn.sig.inputs.is_empty() {
        return Err(syn::Error::new_spanned(
            &input_fn.sig.inputs,
            "routine factories take no arguments",
        ));
    }
    if input_fn.sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            input_fn.sig.asyncness,
            "routine factories return a step sequence and cannot be async",
        ));
    }

    let (key, enabled) = parse_routine_args(attr_args, fn_name)?;

    // Generate unique registration function name
    let register_fn_name = syn::Ident::new(
        &format!("__register_routine_{}", fn_name),
        fn_name.span(),
    );

    let expanded = quote! {
        #input_fn

        // Auto-registration using linkme
        #[::tickflow::tickflow_runtime::linkme::distributed_slice(::tickflow::tickflow_runtime::COROUTINES)]
        #[linkme(crate = ::tickflow::tickflow_runtime::linkme)]
        fn #register_fn_name() -> ::tickflow::tickflow_runtime::CoroutineEntry {
            ::tickflow::tickflow_runtime::CoroutineEntry {
                key: #key,
                enabled: #enabled,
                define: || ::tickflow::tickflow_runtime::TaskDefinition::new(#key, #fn_name),
            }
        }
    };

    Ok(expanded)
}

fn parse_routine_args(
    attr_args: &syn::punctuated::Punctuated<Meta, syn::Token![,]>,
    fn_name: &syn::Ident,
) -> syn::Result<(String, String)> {
    let mut key = None;
    let mut enabled = None;

    for arg in attr_args {
        let Meta::NameValue(MetaNameValue { path, value, .. }) = arg else {
            return Err(syn::Error::new_spanned(arg, "expected `name = value`"));
        };
        let path_str = path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default();

        match path_str.as_str() {
            "key" => match value {
                Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) if !s.value().is_empty() => {
                    key = Some(s.value());
                }
                _ => return Err(syn::Error::new_spanned(value, "key must be a non-empty string")),
            },
            "enabled" => {
                enabled = Some(match value {
                    Expr::Lit(ExprLit { lit: Lit::Bool(b), .. }) => b.value.to_string(),
                    Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => s.value(),
                    _ => return Err(syn::Error::new_spanned(value, "enabled must be bool or string")),
                });
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    path,
                    format!("unknown routine parameter `{}`", path_str),
                ))
            }
        }
    }

    let key = key.ok_or_else(|| {
        syn::Error::new_spanned(
            fn_name,
            format!("routine `{}` needs an explicit key, e.g. #[routine(key = \"{}\")]", fn_name, fn_name),
        )
    })?;
    let enabled = enabled.unwrap_or_else(|| "true".to_string());

    Ok((key, enabled))
}
