use std::sync::Arc;

use rocket::fairing::{AdHoc, Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Request, Response};

use crate::config::AppConfig;
use crate::repository::SharedRepository;

/// Adds CORS headers for origins on the configured allow-list.
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let Some(origin) = req.headers().get_one("Origin") else {
            return;
        };
        let allowed = req
            .rocket()
            .state::<AppConfig>()
            .is_some_and(|config| config.allows_origin(origin));
        if !allowed {
            return;
        }

        res.set_header(Header::new("Access-Control-Allow-Origin", origin.to_owned()));
        res.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
        res.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));
        res.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, X-Admin-Token",
        ));
        res.set_header(Header::new("Vary", "Origin"));
    }
}

/// Logs one line per response.
pub struct RequestLog;

#[rocket::async_trait]
impl Fairing for RequestLog {
    fn info(&self) -> Info {
        Info {
            name: "Request log",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        tracing::info!(
            method = %req.method(),
            path = %req.uri().path(),
            status = res.status().code,
            "handled request"
        );
    }
}

/// Ensures the `todos` table exists before the server starts listening.
///
/// Outside production a failure aborts the launch. In production the server
/// still starts and the health check reports the database as unavailable.
pub fn schema_bootstrap() -> AdHoc {
    AdHoc::try_on_ignite("Schema bootstrap", |rocket| async move {
        let Some(repo) = rocket.state::<SharedRepository>().map(Arc::clone) else {
            tracing::error!("no todo repository is managed; cannot bootstrap schema");
            return Err(rocket);
        };
        let Some((seed, environment)) = rocket
            .state::<AppConfig>()
            .map(|config| (config.seed_on_create, config.environment))
        else {
            tracing::error!("no configuration is managed; cannot bootstrap schema");
            return Err(rocket);
        };

        match repo.ensure_schema(seed).await {
            Ok(status) => {
                tracing::info!(
                    created = status.created,
                    seeded = status.seeded,
                    rows = status.rows,
                    "todos table ready"
                );
                Ok(rocket)
            }
            Err(err) if environment.is_production() => {
                tracing::error!(error = %err, "schema bootstrap failed; serving with degraded health");
                Ok(rocket)
            }
            Err(err) => {
                tracing::error!(error = %err, "schema bootstrap failed; aborting launch");
                Err(rocket)
            }
        }
    })
}

pub fn lifecycle_log() -> AdHoc {
    AdHoc::on_liftoff("Startup log", |rocket| {
        Box::pin(async move {
            let config = rocket.config();
            let environment = rocket
                .state::<AppConfig>()
                .map_or("unknown", |c| c.environment.as_str());
            tracing::info!(
                address = %config.address,
                port = config.port,
                environment,
                "todo api listening; health check at /api/health"
            );
        })
    })
}

pub fn shutdown_log() -> AdHoc {
    AdHoc::on_shutdown("Pool release", |_| {
        Box::pin(async move {
            tracing::info!("shutting down; database pool is released with the server");
        })
    })
}
