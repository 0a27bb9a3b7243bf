//! Service catalogue queries

use mothr_core::domain::service::ServiceInfo;

use crate::MothrClient;
use crate::error::Result;
use crate::operations;

impl MothrClient {
    /// List all registered services
    ///
    /// # Returns
    /// One entry per service name and version
    pub async fn services(&self) -> Result<Vec<ServiceInfo>> {
        let response = self.session().execute(&operations::services()).await?;
        response.require("services")
    }

    /// Get every registered version of a service
    ///
    /// # Arguments
    /// * `name` - The service name
    ///
    /// # Returns
    /// The matching versions with their declared parameters
    pub async fn service(&self, name: &str) -> Result<Vec<ServiceInfo>> {
        let response = self.session().execute(&operations::service(name)).await?;
        response.require("service")
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{self, ScriptedSubscriptions, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_services() {
        let requests = Arc::new(ScriptedTransport::new());
        requests.push_data(json!({
            "services": [
                {"name": "test-service", "version": "latest"},
                {"name": "test-service", "version": "dev"},
                {"name": "test-service2", "version": "latest"},
                {"name": "test-service2", "version": "dev"}
            ]
        }));
        let client = testing::client(requests, Arc::new(ScriptedSubscriptions::new()));

        let services = client.services().await.unwrap();

        assert_eq!(services.len(), 4);
        assert_eq!(services[1].version.as_deref(), Some("dev"));
    }

    #[tokio::test]
    async fn test_service() {
        let requests = Arc::new(ScriptedTransport::new());
        requests.push_data(json!({
            "service": [
                {
                    "name": "test",
                    "version": "latest",
                    "parameters": [{"name": "param1", "fileType": {"name": "text"}}]
                },
                {
                    "name": "test",
                    "version": "dev",
                    "parameters": [{"name": "param1", "fileType": {"name": "text"}}]
                }
            ]
        }));
        let client = testing::client(requests.clone(), Arc::new(ScriptedSubscriptions::new()));

        let service = client.service("test").await.unwrap();

        assert_eq!(service.len(), 2);
        assert_eq!(
            service[0].parameters[0].file_type.as_ref().unwrap().name,
            "text"
        );
        assert_eq!(requests.calls()[0].variables["name"], "test");
    }
}
