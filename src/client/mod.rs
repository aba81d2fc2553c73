use std::sync::Arc;

use futures::FutureExt;
use reqwest::header;

use crate::api::SchemaRegistryAPI;
use crate::client::config::SchemaRegistryConfig;
use crate::client::http_util::{exec_calls, parse_response, VND_SCHEMA_REGISTRY_V1_JSON};
use crate::context;
use crate::error::SchemaRegistryError;
use crate::types::{
    ClusterConfig, CompatibilityCheck, Id, Mode, ResourceMode, Schema, StringSchema, Subject,
    SubjectConfig, SubjectVersion, Tag, TagAssignment, UnregisteredSchema, Version,
};

pub mod config;
mod http_util;

/// A simple client for interacting with a Confluent-style Schema Registry.
///
/// This client is a thin wrapper around the `reqwest` HTTP client. It fans a
/// call out across every configured URL and takes the first success,
/// tolerating a registry fronted by multiple equivalent endpoints.
#[derive(Clone)]
pub struct SchemaRegistryClient {
    urls: Arc<[String]>,
    http: reqwest::Client,
    context: Option<Arc<str>>,
}

impl SchemaRegistryClient {
    /// Create a new `SchemaRegistryClient` from a single URL.
    pub fn from_url(url: &str) -> Result<Self, SchemaRegistryError> {
        Self::from_conf(SchemaRegistryConfig::new().url(url))
    }

    /// Create a new `SchemaRegistryClient` from a `SchemaRegistryConfig`.
    pub fn from_conf(conf: SchemaRegistryConfig) -> Result<Self, SchemaRegistryError> {
        let urls = Arc::from(conf.urls.clone());
        let context = conf.context.clone().map(Arc::from);
        let http = config::build_http_client(&conf)?;

        Ok(Self {
            http,
            urls,
            context,
        })
    }

    /// Returns a derived client bound to `context`, so callers no longer
    /// need to qualify subjects themselves. Shares the underlying HTTP
    /// client and URL list.
    pub fn with_context(&self, context: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            urls: self.urls.clone(),
            context: Some(Arc::from(context.into())),
        }
    }

    fn subject_path(&self, subject: &str) -> String {
        context::rewrite_subject(subject, self.context.as_deref().unwrap_or(""))
    }
}

#[async_trait::async_trait]
impl SchemaRegistryAPI for SchemaRegistryClient {
    async fn is_compatible(
        &self,
        subject: &str,
        version: Version,
        schema: &UnregisteredSchema,
    ) -> Result<bool, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!(
                "{}/compatibility/subjects/{}/versions/{}",
                url, subject, version
            );

            let call = async move {
                let response = http
                    .post(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .json(schema)
                    .send()
                    .await?;

                parse_response::<CompatibilityCheck>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        let result = exec_calls(http_calls).await?;

        Ok(result.is_compatible)
    }

    async fn get_configuration(&self) -> Result<ClusterConfig, SchemaRegistryError> {
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/config", url);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<ClusterConfig>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn update_configuration(
        &self,
        configuration: &ClusterConfig,
    ) -> Result<ClusterConfig, SchemaRegistryError> {
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/config", url);

            let call = async move {
                let response = http
                    .put(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .json(configuration)
                    .send()
                    .await?;

                parse_response::<ClusterConfig>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn get_subject_configuration(
        &self,
        subject: &str,
    ) -> Result<SubjectConfig, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/config/{}", url, subject);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<SubjectConfig>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn update_subject_configuration(
        &self,
        subject: &str,
        configuration: &SubjectConfig,
    ) -> Result<SubjectConfig, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/config/{}", url, subject);

            let call = async move {
                let response = http
                    .put(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .json(configuration)
                    .send()
                    .await?;

                parse_response::<SubjectConfig>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn delete_subject_configuration(&self, subject: &str) -> Result<(), SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/config/{}", url, subject);

            let call = async move {
                let response = http
                    .delete(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<String>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await?;

        Ok(())
    }

    async fn get_contexts(&self) -> Result<Vec<String>, SchemaRegistryError> {
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/contexts", url);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Vec<String>>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn get_global_resource_mode(&self) -> Result<Mode, SchemaRegistryError> {
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/mode", url);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<ResourceMode>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        let result = exec_calls(http_calls).await?;

        Ok(result.mode)
    }

    async fn update_global_resource_mode(
        &self,
        mode: Mode,
        force: bool,
    ) -> Result<Mode, SchemaRegistryError> {
        let body = ResourceMode { mode };
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/mode?force={}", url, force);

            let call = async move {
                let response = http
                    .put(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .json(&body)
                    .send()
                    .await?;

                parse_response::<ResourceMode>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        let result = exec_calls(http_calls).await?;

        Ok(result.mode)
    }

    async fn get_subject_resource_mode(&self, subject: &str) -> Result<Mode, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/mode/{}", url, subject);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<ResourceMode>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        let result = exec_calls(http_calls).await?;

        Ok(result.mode)
    }

    async fn update_subject_resource_mode(
        &self,
        subject: &str,
        mode: Mode,
        force: bool,
    ) -> Result<Mode, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let body = ResourceMode { mode };
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let body = body.clone();
            let url = format!("{}/mode/{}?force={}", url, subject, force);

            let call = async move {
                let response = http
                    .put(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .json(&body)
                    .send()
                    .await?;

                parse_response::<ResourceMode>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        let result = exec_calls(http_calls).await?;

        Ok(result.mode)
    }

    async fn delete_subject_resource_mode(&self, subject: &str) -> Result<(), SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/mode/{}", url, subject);

            let call = async move {
                let response = http
                    .delete(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<String>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await?;

        Ok(())
    }

    async fn get_schema_by_id(&self, id: u32) -> Result<Schema, SchemaRegistryError> {
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/schemas/ids/{}", url, id);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Schema>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn get_schema_subject_versions(
        &self,
        id: u32,
    ) -> Result<Vec<SubjectVersion>, SchemaRegistryError> {
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/schemas/ids/{}/versions", url, id);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Vec<SubjectVersion>>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn get_subjects(&self, deleted: bool) -> Result<Vec<String>, SchemaRegistryError> {
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/subjects?deleted={}", url, deleted);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Vec<String>>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn get_subject_versions(
        &self,
        subject: &str,
        deleted: bool,
    ) -> Result<Vec<u32>, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/subjects/{}/versions?deleted={}", url, subject, deleted);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Vec<u32>>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn delete_subject(
        &self,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<u32>, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/subjects/{}?permanent={}", url, subject, permanent);

            let call = async move {
                let response = http
                    .delete(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Vec<u32>>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn get_subject_version(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<Subject, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/subjects/{}/versions/{}", url, subject, version);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Subject>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn get_subject_version_raw(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<StringSchema, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/subjects/{}/versions/{}/schema", url, subject, version);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<StringSchema>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn register_schema(
        &self,
        subject: &str,
        schema: &UnregisteredSchema,
    ) -> Result<u32, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/subjects/{}/versions", url, subject);

            let call = async move {
                let response = http
                    .post(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .json(schema)
                    .send()
                    .await?;

                parse_response::<Id>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        let result = exec_calls(http_calls).await?;

        Ok(result.id)
    }

    async fn lookup_subject_schema(
        &self,
        subject: &str,
        schema: &UnregisteredSchema,
    ) -> Result<Subject, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/subjects/{}", url, subject);

            let call = async move {
                let response = http
                    .post(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .json(schema)
                    .send()
                    .await?;

                parse_response::<Subject>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn delete_subject_version(
        &self,
        subject: &str,
        version: Version,
        permanent: bool,
    ) -> Result<u32, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!(
                "{}/subjects/{}/versions/{}?permanent={}",
                url, subject, version, permanent
            );

            let call = async move {
                let response = http
                    .delete(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<u32>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn get_schema_referenced_by(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<Vec<u32>, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!(
                "{}/subjects/{}/versions/{}/referencedby",
                url, subject, version
            );

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Vec<u32>>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, SchemaRegistryError> {
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/catalog/v1/types/tagdefs", url);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Vec<Tag>>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn create_tag(&self, tag: &Tag) -> Result<Tag, SchemaRegistryError> {
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/catalog/v1/types/tagdefs", url);

            let call = async move {
                let response = http
                    .post(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .json(tag)
                    .send()
                    .await?;

                parse_response::<Tag>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn assign_tag(&self, assignment: &TagAssignment) -> Result<(), SchemaRegistryError> {
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let url = format!("{}/catalog/v1/entity/tags", url);

            let call = async move {
                let response = http
                    .post(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .json(assignment)
                    .send()
                    .await?;

                parse_response::<()>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await?;

        Ok(())
    }

    async fn list_subject_tags(&self, subject: &str) -> Result<Vec<TagAssignment>, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!("{}/catalog/v1/entity/subject/{}/tags", url, subject);

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Vec<TagAssignment>>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }

    async fn list_version_tags(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<Vec<TagAssignment>, SchemaRegistryError> {
        let subject = self.subject_path(subject);
        let mut http_calls = Vec::with_capacity(self.urls.len());

        for url in self.urls.iter() {
            let http = self.http.clone();
            let subject = subject.clone();
            let url = format!(
                "{}/catalog/v1/entity/subject/{}/version/{}/tags",
                url, subject, version
            );

            let call = async move {
                let response = http
                    .get(&url)
                    .header(header::ACCEPT, VND_SCHEMA_REGISTRY_V1_JSON)
                    .send()
                    .await?;

                parse_response::<Vec<TagAssignment>>(response).await
            }
            .boxed();

            http_calls.push(call);
        }

        exec_calls(http_calls).await.map_err(Into::into)
    }
}
