use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::fir;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(fir::upload_fir))
        .routes(routes!(fir::get_all_firs))
        .routes(routes!(fir::get_fir))
        .routes(routes!(fir::search_fir))
        .routes(routes!(fir::get_statistics))
}
