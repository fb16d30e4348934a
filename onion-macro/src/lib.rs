use proc_macro::TokenStream;

mod layer;

/// Attribute macro for declaring metadata on a layer implementation
///
/// Each `#[layer(...)]` attribute is one metadata record. The attribute is
/// repeatable; records are kept in source order and merged left to right when
/// a failure context is built, so later keys override earlier ones.
///
/// Values can be any expression that implements `serde::Serialize`.
///
/// # Example
/// ```ignore
/// use onion::{layer, BoxError, Layer};
///
/// struct Checkout;
///
/// #[layer(stage = "billing", retries = 3)]
/// #[layer(owner = "payments")]
/// impl Layer<Order> for Checkout {
///     fn invoke(&self, order: Order) -> Result<Order, BoxError> {
///         // ...
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn layer(attr: TokenStream, item: TokenStream) -> TokenStream {
    layer::layer_attribute(attr, item)
}
