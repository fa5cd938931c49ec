// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the reqwest server API client

#[cfg(test)]
mod tests {
    use crate::errors::ServerApiError;
    use crate::server_api::{
        build_base_url, HttpServerApiProvider, Lifecycle, ServerApi, ServerApiProvider,
    };
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn connect(server: &MockServer) -> Box<dyn ServerApi> {
        HttpServerApiProvider::new()
            .unwrap()
            .connect(&server.uri())
            .unwrap()
    }

    #[test]
    fn test_build_base_url() {
        assert_eq!(
            build_base_url("10.0.0.1:9000").unwrap(),
            "http://10.0.0.1:9000"
        );
        assert_eq!(
            build_base_url("https://sonar.example.com/").unwrap(),
            "https://sonar.example.com"
        );
        assert!(matches!(
            build_base_url("http://exa mple.com"),
            Err(ServerApiError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .mount(&server)
            .await;

        assert!(connect(&server).await.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_ping_rejects_other_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong!"))
            .mount(&server)
            .await;

        assert!(matches!(
            connect(&server).await.ping().await,
            Err(ServerApiError::UnexpectedBody { .. })
        ));
    }

    #[tokio::test]
    async fn test_ping_rejects_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/ping"))
            .respond_with(ResponseTemplate::new(202).set_body_string("pong"))
            .mount(&server)
            .await;

        assert!(matches!(
            connect(&server).await.ping().await,
            Err(ServerApiError::UnexpectedStatus { status: 202, .. })
        ));
    }

    #[tokio::test]
    async fn test_status_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "20150504120436",
                "version": "9.9.0.65466",
                "status": "DB_MIGRATION_NEEDED"
            })))
            .mount(&server)
            .await;

        let status = connect(&server).await.status().await.unwrap();
        assert_eq!(status.id, "20150504120436");
        assert_eq!(status.version.major_minor_patch(), "9.9.0");
        assert_eq!(status.version.build, "65466");
        assert_eq!(status.lifecycle, Lifecycle::DbMigrationNeeded);
    }

    #[tokio::test]
    async fn test_status_unknown_lifecycle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "x",
                "version": "10.0",
                "status": "MAINTENANCE"
            })))
            .mount(&server)
            .await;

        let status = connect(&server).await.status().await.unwrap();
        assert_eq!(status.lifecycle, Lifecycle::Unknown);
    }

    #[tokio::test]
    async fn test_status_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/status"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(matches!(
            connect(&server).await.status().await,
            Err(ServerApiError::UnexpectedStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_upgrades_decode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/upgrades"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "upgrades": [
                    {
                        "version": "10.4",
                        "description": "LTA",
                        "releaseDate": "2024-02-05",
                        "plugins": {
                            "requireUpdate": [{"key": "java", "name": "Java", "version": "8.0"}],
                            "incompatible": []
                        }
                    },
                    {
                        "version": "10.5.1",
                        "plugins": {
                            "incompatible": [{"key": "legacy", "name": "Legacy"}]
                        }
                    }
                ],
                "updateCenterRefresh": "2024-06-01T10:00:00+0000"
            })))
            .mount(&server)
            .await;

        let upgrades = connect(&server).await.upgrades().await.unwrap();
        assert_eq!(upgrades.upgrades.len(), 2);
        assert_eq!(upgrades.upgrades[0].version.to_string(), "10.4.0.0");
        assert_eq!(upgrades.upgrades[0].plugins.require_update.len(), 1);
        assert_eq!(upgrades.upgrades[1].plugins.incompatible[0].key, "legacy");
        assert!(upgrades.update_center_refresh.is_some());
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        let provider = HttpServerApiProvider::new().unwrap();
        let api = provider.connect("http://127.0.0.1:1").unwrap();
        assert!(matches!(
            api.status().await,
            Err(ServerApiError::Request { .. })
        ));
    }
}
