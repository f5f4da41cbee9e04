//! Router builder for the HTTP server

use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use bookstore_kernel::ModuleRegistry;

/// Builder for constructing the main HTTP router.
///
/// Middleware is recorded and applied in [`RouterBuilder::build`], so it wraps
/// every route regardless of the order the builder methods were called in.
pub struct RouterBuilder {
    router: Router,
    tracing: bool,
    cors: bool,
    request_id: bool,
    timeout: Option<Duration>,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            tracing: false,
            cors: false,
            request_id: false,
            timeout: None,
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router under `mount_path`; `/` merges it at the root
    pub fn mount_module(mut self, mount_path: &str, module_router: Router) -> Self {
        self.router = if mount_path == "/" {
            self.router.merge(module_router)
        } else {
            self.router.nest(mount_path, module_router)
        };
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Add request ID middleware
    pub fn with_request_id(mut self) -> Self {
        self.request_id = true;
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    /// Add OpenAPI documentation by collecting specs from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = merged_openapi(registry);

        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(openapi_spec.clone())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "merged OpenAPI document is invalid, serving a stub");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title("Bookstore API")
                            .version("1.0.0")
                            .build(),
                    )
                    .build()
            });

        // Swagger UI serves both the UI and the spec it was given
        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        // Raw JSON spec for external consumers
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        let mut router = self.router;

        if let Some(timeout) = self.timeout {
            router = router.layer(TimeoutLayer::new(timeout));
        }
        if self.cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }
        if self.tracing {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            );
        }
        // Outermost, so the trace span already sees the id
        if self.request_id {
            router = router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        }

        router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge the base document with every module's OpenAPI fragment.
pub fn merged_openapi(registry: &ModuleRegistry) -> serde_json::Value {
    let mut openapi_spec = serde_json::json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Bookstore API",
            "version": "1.0.0",
            "description": "CRUD, search and reporting over the books collection"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
        "type": "object",
        "properties": {
            "error": {
                "type": "object",
                "properties": {
                    "code": { "type": "string" },
                    "message": { "type": "string" },
                    "details": { "type": "array", "items": {} },
                    "trace_id": { "type": "string" },
                    "timestamp": { "type": "string" }
                },
                "required": ["code", "message", "trace_id", "timestamp"]
            }
        },
        "required": ["error"]
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {
                        "text/plain": { "schema": { "type": "string" } }
                    }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };

        let mount_path = module.mount_path();
        let prefix = mount_path.trim_end_matches('/');

        if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                openapi_spec["paths"][format!("{}{}", prefix, path)] = path_item.clone();
            }
        }

        if let Some(schemas) = module_spec
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }
    }

    openapi_spec
}
