//! Hosted providers: a static model catalog gated by API key availability.

use {
    async_trait::async_trait,
    gatehouse_bootstrap::{
        CredentialSource, HostedResolution, ModelDescriptor, ModelSource, Profile,
        ProviderAvailabilityMap, ServiceResult, model::MARKETPLACE_PROVIDER,
        services::HostedModelResolver,
    },
    gatehouse_config::ProvidersConfig,
};

struct HostedModel {
    id: &'static str,
    name: &'static str,
    image_input: bool,
}

/// Known hosted provider and the models it contributes once a key exists.
pub struct KnownProvider {
    pub name: &'static str,
    pub platform_link: &'static str,
    models: &'static [HostedModel],
}

const fn model(id: &'static str, name: &'static str, image_input: bool) -> HostedModel {
    HostedModel {
        id,
        name,
        image_input,
    }
}

pub const KNOWN_PROVIDERS: &[KnownProvider] = &[
    KnownProvider {
        name: "openai",
        platform_link: "https://platform.openai.com/docs/overview",
        models: &[
            model("gpt-4o", "GPT-4o", true),
            model("gpt-4o-mini", "GPT-4o mini", true),
            model("gpt-4-turbo-preview", "GPT-4 Turbo", false),
            model("gpt-3.5-turbo", "GPT-3.5 Turbo", false),
        ],
    },
    KnownProvider {
        name: "anthropic",
        platform_link: "https://docs.anthropic.com/claude/reference/getting-started-with-the-api",
        models: &[
            model("claude-3-5-sonnet-20240620", "Claude 3.5 Sonnet", true),
            model("claude-3-opus-20240229", "Claude 3 Opus", true),
            model("claude-3-haiku-20240307", "Claude 3 Haiku", true),
        ],
    },
    KnownProvider {
        name: "google",
        platform_link: "https://ai.google.dev/docs",
        models: &[
            model("gemini-1.5-pro-latest", "Gemini 1.5 Pro", true),
            model("gemini-1.5-flash", "Gemini 1.5 Flash", true),
        ],
    },
    KnownProvider {
        name: "mistral",
        platform_link: "https://docs.mistral.ai/",
        models: &[
            model("mistral-large-latest", "Mistral Large", false),
            model("mistral-small-latest", "Mistral Small", false),
        ],
    },
    KnownProvider {
        name: "groq",
        platform_link: "https://console.groq.com/docs",
        models: &[
            model("llama3-70b-8192", "LLaMA3-70b", false),
            model("mixtral-8x7b-32768", "Mixtral-8x7b", false),
        ],
    },
    KnownProvider {
        name: "perplexity",
        platform_link: "https://docs.perplexity.ai/",
        models: &[model(
            "llama-3-sonar-large-32k-online",
            "Sonar Large Online",
            false,
        )],
    },
    // Listed for availability only; its models come from the marketplace
    // catalog.
    KnownProvider {
        name: MARKETPLACE_PROVIDER,
        platform_link: "https://openrouter.ai/docs",
        models: &[],
    },
];

/// Resolves hosted availability from operator keys (config/env) and the
/// profile's own keys. Operator keys win when both exist.
pub struct CatalogHostedResolver {
    config: ProvidersConfig,
}

impl CatalogHostedResolver {
    pub fn new(config: ProvidersConfig) -> Self {
        Self { config }
    }

    pub fn resolve_sync(&self, profile: &Profile) -> HostedResolution {
        let mut availability = ProviderAvailabilityMap::new();
        let mut models = Vec::new();

        for provider in KNOWN_PROVIDERS {
            let source = if self.config.has_env_key(provider.name) {
                CredentialSource::Environment
            } else if profile.has_api_key(provider.name) {
                CredentialSource::User
            } else {
                continue;
            };
            availability.insert(provider.name.to_string(), source);
            models.extend(provider.models.iter().map(|m| {
                ModelDescriptor::new(m.id, m.name, provider.name, ModelSource::Hosted)
                    .with_image_input(m.image_input)
                    .with_platform_link(provider.platform_link)
            }));
        }

        HostedResolution {
            availability,
            models,
        }
    }
}

#[async_trait]
impl HostedModelResolver for CatalogHostedResolver {
    async fn resolve(&self, profile: &Profile) -> ServiceResult<HostedResolution> {
        Ok(self.resolve_sync(profile))
    }
}
