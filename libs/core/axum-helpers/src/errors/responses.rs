//! Reusable OpenAPI responses for the failure envelope.

use super::ErrorResponse;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Bad Request - parameter or business-rule error",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 40000,
        "data": {
            "account": [{
                "code": "length",
                "message": "account must be 6-20 characters",
                "params": {"min": 6, "max": 20, "value": "abc"}
            }]
        },
        "message": "request parameter error",
        "description": "account must be 6-20 characters"
    })
)]
pub struct BadRequestResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Unauthorized - no valid session",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 40100,
        "data": null,
        "message": "not logged in",
        "description": "no token provided"
    })
)]
pub struct UnauthorizedResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Forbidden - administrator role required",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 40101,
        "data": null,
        "message": "no permission",
        "description": "administrator role required"
    })
)]
pub struct ForbiddenResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Not Found",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 40001,
        "data": null,
        "message": "requested data is empty",
        "description": "user not found"
    })
)]
pub struct NotFoundResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "success": false,
        "code": 50000,
        "data": null,
        "message": "internal system error",
        "description": "internal system error"
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);
