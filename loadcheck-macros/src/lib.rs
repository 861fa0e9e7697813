use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Expr, Ident, ItemFn};

/// Proc macro to denote a Transaction
///
/// Takes the `TransactionLabels` to record into. Every call records the response time of the
/// requests it makes into the latency trend, increments either the success or the error counter, and adds the outcome to the
/// error rate.
///
/// NOTE: This macro only works on async functions with a `Result<T, E>` return value.
///
/// # Example
/// ```ignore
/// use loadcheck::prelude::*;
/// use loadcheck::transaction::TransactionLabels;
///
/// const LABELS: TransactionLabels = TransactionLabels {
///     latency: "request_duration",
///     success: "successful_requests",
///     error: "failed_requests",
///     error_rate: "errors",
/// };
///
/// #[transaction(LABELS)]
/// async fn my_transaction(arg_1: u32, arg_2: &str) -> Result<String, MyError> {
///     ...
/// }
/// ```
#[proc_macro_attribute]
pub fn transaction(attr: TokenStream, item: TokenStream) -> TokenStream {
    transaction_internal(attr, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn transaction_internal(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream2> {
    let labels = syn::parse::<Expr>(attr)?;
    let input = syn::parse::<ItemFn>(item)?;

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;
    if sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            sig.fn_token,
            "#[transaction] only works on async functions",
        ));
    }
    let stmts = &block.stmts;

    Ok(quote! {
        #(#attrs)* #vis #sig {
            ::loadcheck::transaction::transaction_hook(#labels, async move {
                #(#stmts)*
            }).await
        }
    })
}

/// Proc macro to denote a Scenario
///
/// NOTE: Currently this macro only works on async functions which take no arguments and with no
/// return value.
///
/// See the `Scenario` struct for more information on the methods this macro provides on functions.
///
/// # Example
/// ```ignore
/// use loadcheck::prelude::*;
///
/// #[scenario]
/// async fn my_scenario() {
/// }
/// ```
#[proc_macro_attribute]
pub fn scenario(attr: TokenStream, item: TokenStream) -> TokenStream {
    scenario_internal(attr, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn scenario_internal(_attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream2> {
    let input = syn::parse::<ItemFn>(item)?;

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;
    if !sig.inputs.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            "#[scenario] functions take no arguments",
        ));
    }
    let stmts = &block.stmts;

    let new_name = Ident::new(&format!("__loadcheck_{}", sig.ident), Span::call_site());
    let mut new_sig = sig.clone();
    new_sig.ident = new_name.clone();

    let mut scen_sig = sig.clone();
    let scen_name = sig.ident.clone();
    scen_sig.asyncness = None;
    scen_sig.output = syn::parse2(quote! {
        -> impl ::loadcheck::scenario::ConfigurableScenario<::loadcheck::scenario::ScenarioOutput>
    })?;

    Ok(quote! {
        #(#attrs)* #vis #scen_sig {
            ::loadcheck::scenario::Scenario::new(stringify!(#scen_name), #new_name)
        }

        #[doc(hidden)]
        #vis #new_sig {
            #(#stmts)*
        }
    })
}
