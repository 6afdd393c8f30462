// core/examples/checkout_validation.rs

use storefront_core::payment::{CheckoutLineItem, Payer, ReturnUrls};
use storefront_core::{is_valid_cpf, mask_cpf_input, Cpf, Money, PreferenceDraft, ProductId, TotpSecret};

fn main() -> Result<(), Box<dyn std::error::Error>> {
  // CPF as typed into the checkout form
  for typed in ["5299822", "52998224725", "111.111.111-11"] {
    println!("{:<16} mask={:<16} valid={}", typed, mask_cpf_input(typed), is_valid_cpf(typed));
  }

  let draft = PreferenceDraft {
    items: vec![CheckoutLineItem {
      product_id: ProductId::generate(),
      title: "Calça Alfaiataria".to_string(),
      quantity: 1,
      unit_price: Money::from_decimal_str("289,90")?,
      picture_url: None,
      size: Some("40".to_string()),
      color: Some("Preto".to_string()),
    }],
    payer: Some(Payer {
      name: "Maria Silva".to_string(),
      email: "maria@example.com".to_string(),
      cpf: Cpf::parse("529.982.247-25")?,
    }),
    return_urls: ReturnUrls::for_storefront("https://loja.example.com"),
    shipping_cost: Some(Money::from_cents(2490)),
    external_reference: "demo-order".to_string(),
    notification_url: None,
  };
  println!("Order total: {}", draft.total()?);
  println!("{}", serde_json::to_string_pretty(&draft.to_request()?)?);

  // Admin 2FA enrollment
  let secret = TotpSecret::generate();
  println!("Provisioning URI: {}", secret.provisioning_uri("Storefront Admin", "admin@loja.com"));
  Ok(())
}
