// server/src/services/postal_client.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use storefront_core::{Cep, CoreResult, PostalAddress, PostalLookup};
use tracing::{debug, instrument};

use super::http::{read_json, transport_error, trim_base};

const PROVIDER: &str = "cep";

/// ViaCEP answers 200 with `{"erro": true}` (sometimes `"true"`) for unknown CEPs.
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
  #[serde(default)]
  erro: Option<serde_json::Value>,
  #[serde(default)]
  logradouro: String,
  #[serde(default)]
  bairro: String,
  #[serde(default)]
  localidade: String,
  #[serde(default)]
  uf: String,
}

impl ViaCepResponse {
  fn into_address(self, cep: &Cep) -> Option<PostalAddress> {
    if self.erro.is_some() {
      return None;
    }
    Some(PostalAddress {
      cep: cep.clone(),
      street: self.logradouro,
      neighborhood: self.bairro,
      city: self.localidade,
      state: self.uf,
    })
  }
}

pub struct PostalLookupClient {
  http: Client,
  base_url: String,
}

impl PostalLookupClient {
  pub fn new(http: Client, base_url: &str) -> Self {
    Self {
      http,
      base_url: trim_base(base_url),
    }
  }
}

#[async_trait]
impl PostalLookup for PostalLookupClient {
  #[instrument(name = "service::cep_lookup", skip(self), fields(cep = %cep))]
  async fn lookup(&self, cep: &Cep) -> CoreResult<Option<PostalAddress>> {
    let url = format!("{}/ws/{}/json/", self.base_url, cep.digits());
    let response = self.http.get(&url).send().await.map_err(|e| transport_error(PROVIDER, e))?;
    let body: ViaCepResponse = read_json(PROVIDER, response).await?;
    let address = body.into_address(cep);
    debug!(found = address.is_some(), "CEP lookup finished.");
    Ok(address)
  }
}
