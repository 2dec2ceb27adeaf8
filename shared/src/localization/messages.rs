//! Error and success codes: a stable code, the catalog key of its message and
//! the HTTP status it maps to.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorCode {
    pub code: &'static str,
    pub message_key: &'static str,
    pub status: u16,
}

impl ErrorCode {
    pub const fn new(code: &'static str, message_key: &'static str, status: u16) -> Self {
        Self {
            code,
            message_key,
            status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuccessCode {
    pub code: &'static str,
    pub message_key: &'static str,
    pub status: u16,
}

impl SuccessCode {
    pub const fn new(code: &'static str, message_key: &'static str, status: u16) -> Self {
        Self {
            code,
            message_key,
            status,
        }
    }
}

pub mod errors {
    use super::ErrorCode;

    pub const PRODUCT_NOT_FOUND: ErrorCode = ErrorCode::new("PRODUCT_NOT_FOUND", "error.product.notfound", 404);
    pub const PRODUCT_NAME_EXISTS: ErrorCode = ErrorCode::new("PRODUCT_NAME_EXISTS", "error.product.name_exists", 409);
    pub const PRODUCT_ALREADY_EXISTS: ErrorCode = ErrorCode::new("PRODUCT_ALREADY_EXISTS", "error.product.already_exists", 409);
    pub const IMAGE_FILENAME_NOT_UNIQUE: ErrorCode = ErrorCode::new("IMAGE_FILENAME_NOT_UNIQUE", "error.image.filename_not_unique", 409);
    pub const PRODUCT_VARIANTS_NOT_FOUND: ErrorCode = ErrorCode::new("PRODUCT_VARIANTS_NOT_FOUND", "error.product.variants_notfound", 404);

    pub const CATEGORY_NOT_FOUND: ErrorCode = ErrorCode::new("CATEGORY_NOT_FOUND", "error.category.notfound", 404);
    pub const SUBCATEGORY_NOT_FOUND: ErrorCode = ErrorCode::new("SUBCATEGORY_NOT_FOUND", "error.subcategory.notfound", 404);

    pub const DATABASE_OPERATIONAL_ERROR: ErrorCode = ErrorCode::new("DATABASE_OPERATIONAL_ERROR", "error.database.operational", 503);
    pub const DATABASE_INTEGRITY_ERROR: ErrorCode = ErrorCode::new("DATABASE_INTEGRITY_ERROR", "error.database.integrity", 422);
    pub const DATABASE_NOT_FOUND: ErrorCode = ErrorCode::new("DATABASE_NOT_FOUND", "error.database.notfound", 404);
    pub const UNEXPECTED_ERROR: ErrorCode = ErrorCode::new("UNEXPECTED_ERROR", "error.unexpected", 500);
    pub const DATA_RETRIEVAL_FAILED: ErrorCode = ErrorCode::new("DATA_RETRIEVAL_FAILED", "error.data.retrieval_failed", 503);
    pub const VALIDATION_FAILED: ErrorCode = ErrorCode::new("VALIDATION_FAILED", "error.validation.failed", 422);

    pub const CART_NOT_FOUND: ErrorCode = ErrorCode::new("CART_NOT_FOUND", "error.cart.notfound", 404);
    pub const CART_ITEM_NOT_FOUND: ErrorCode = ErrorCode::new("CART_ITEM_NOT_FOUND", "error.cart.item_notfound", 404);
    pub const CART_EMPTY: ErrorCode = ErrorCode::new("CART_EMPTY", "error.cart.empty", 400);
    pub const CART_UPDATE_FAILED: ErrorCode = ErrorCode::new("CART_UPDATE_FAILED", "error.cart.update_failed", 422);
    pub const CART_ADD_FAILED: ErrorCode = ErrorCode::new("CART_ADD_FAILED", "error.cart.add_failed", 422);

    pub const AUTH_UNAUTHORIZED: ErrorCode = ErrorCode::new("AUTH_UNAUTHORIZED", "error.auth.unauthorized", 401);
    pub const AUTH_INVALID_CREDENTIALS: ErrorCode = ErrorCode::new("AUTH_INVALID_CREDENTIALS", "error.auth.credentials", 401);
    pub const AUTH_TOKEN_EXPIRED: ErrorCode = ErrorCode::new("AUTH_TOKEN_EXPIRED", "error.auth.expired", 401);
    pub const AUTH_FORBIDDEN: ErrorCode = ErrorCode::new("AUTH_FORBIDDEN", "error.auth.forbidden", 403);
    pub const AUTH_INSUFFICIENT_PERMISSIONS: ErrorCode = ErrorCode::new("AUTH_INSUFFICIENT_PERMISSIONS", "error.auth.insufficient_permissions", 403);
    pub const AUTH_INVALID_SESSION: ErrorCode = ErrorCode::new("AUTH_INVALID_SESSION", "error.auth.invalid_session", 401);
    pub const AUTH_SERVER_UNAVAILABLE: ErrorCode = ErrorCode::new("AUTH_SERVER_UNAVAILABLE", "error.auth.server_unavailable", 503);
    pub const AUTH_INVALID_AUDIENCE: ErrorCode = ErrorCode::new("AUTH_INVALID_AUDIENCE", "error.auth.invalid_audience", 401);

    pub const USER_NOT_FOUND: ErrorCode = ErrorCode::new("USER_NOT_FOUND", "error.user.notfound", 404);
    pub const USER_CREATION_FAILED: ErrorCode = ErrorCode::new("USER_CREATION_FAILED", "error.user.creation_failed", 400);
    pub const USER_UPDATE_FAILED: ErrorCode = ErrorCode::new("USER_UPDATE_FAILED", "error.user.update_failed", 400);
    pub const USER_DELETE_FAILED: ErrorCode = ErrorCode::new("USER_DELETE_FAILED", "error.user.delete_failed", 400);
    pub const USER_UNAUTHORIZED: ErrorCode = ErrorCode::new("USER_UNAUTHORIZED", "error.user.unauthorized", 403);
    pub const USER_ALREADY_EXISTS: ErrorCode = ErrorCode::new("USER_ALREADY_EXISTS", "error.user.already_exists", 409);
    pub const USER_EMAIL_EXISTS: ErrorCode = ErrorCode::new("USER_EMAIL_EXISTS", "error.user.email_exists", 409);
    pub const USER_PHONE_EXISTS: ErrorCode = ErrorCode::new("USER_PHONE_EXISTS", "error.user.phone_exists", 409);
    pub const USER_NOT_REGISTERED: ErrorCode = ErrorCode::new("USER_NOT_REGISTERED", "error.user.not_registered", 403);

    pub const ORDER_NOT_FOUND: ErrorCode = ErrorCode::new("ORDER_NOT_FOUND", "error.order.notfound", 404);
    pub const ORDER_ITEM_NOT_FOUND: ErrorCode = ErrorCode::new("ORDER_ITEM_NOT_FOUND", "error.order.item_notfound", 404);
    pub const ORDER_CREATION_FAILED: ErrorCode = ErrorCode::new("ORDER_CREATION_FAILED", "error.order.create_failed", 400);
    pub const ORDER_UPDATE_FAILED: ErrorCode = ErrorCode::new("ORDER_UPDATE_FAILED", "error.order.update_failed", 400);
    pub const ORDER_DELETE_FAILED: ErrorCode = ErrorCode::new("ORDER_DELETE_FAILED", "error.order.delete_failed", 400);
    pub const ORDER_CANCEL_FAILED: ErrorCode = ErrorCode::new("ORDER_CANCEL_FAILED", "error.order.cancel_failed", 400);
    pub const ORDER_STATUS_INVALID: ErrorCode = ErrorCode::new("ORDER_STATUS_INVALID", "error.order.status_invalid", 400);
    pub const ORDER_PAYMENT_FAILED: ErrorCode = ErrorCode::new("ORDER_PAYMENT_FAILED", "error.order.payment_failed", 402);
    pub const ORDER_UNAUTHORIZED_ACCESS: ErrorCode = ErrorCode::new("ORDER_UNAUTHORIZED_ACCESS", "error.order.unauthorized_access", 403);
    pub const ORDER_ALREADY_CANCELLED: ErrorCode = ErrorCode::new("ORDER_ALREADY_CANCELLED", "error.order.already_cancelled", 409);

    pub const ROLE_NOT_FOUND: ErrorCode = ErrorCode::new("ROLE_NOT_FOUND", "error.role.notfound", 404);
    pub const ROLE_ASSIGNMENT_FAILED: ErrorCode = ErrorCode::new("ROLE_ASSIGNMENT_FAILED", "error.role.assignment_failed", 400);
    pub const ROLE_REVOCATION_FAILED: ErrorCode = ErrorCode::new("ROLE_REVOCATION_FAILED", "error.role.revocation_failed", 400);

    pub const STREAM_UNAVAILABLE: ErrorCode = ErrorCode::new("STREAM_UNAVAILABLE", "error.stream.unavailable", 503);
    pub const STREAM_NOT_FOUND: ErrorCode = ErrorCode::new("STREAM_NOT_FOUND", "error.stream.notfound", 404);
    pub const MESSAGE_PUBLISH_FAILED: ErrorCode = ErrorCode::new("MESSAGE_PUBLISH_FAILED", "error.message.publish_failed", 502);
    pub const MESSAGE_INVALID: ErrorCode = ErrorCode::new("MESSAGE_INVALID", "error.message.invalid", 400);

    /// Every error code, for catalog checks.
    pub const ALL: &[ErrorCode] = &[
        PRODUCT_NOT_FOUND,
        PRODUCT_NAME_EXISTS,
        PRODUCT_ALREADY_EXISTS,
        IMAGE_FILENAME_NOT_UNIQUE,
        PRODUCT_VARIANTS_NOT_FOUND,
        CATEGORY_NOT_FOUND,
        SUBCATEGORY_NOT_FOUND,
        DATABASE_OPERATIONAL_ERROR,
        DATABASE_INTEGRITY_ERROR,
        DATABASE_NOT_FOUND,
        UNEXPECTED_ERROR,
        DATA_RETRIEVAL_FAILED,
        VALIDATION_FAILED,
        CART_NOT_FOUND,
        CART_ITEM_NOT_FOUND,
        CART_EMPTY,
        CART_UPDATE_FAILED,
        CART_ADD_FAILED,
        AUTH_UNAUTHORIZED,
        AUTH_INVALID_CREDENTIALS,
        AUTH_TOKEN_EXPIRED,
        AUTH_FORBIDDEN,
        AUTH_INSUFFICIENT_PERMISSIONS,
        AUTH_INVALID_SESSION,
        AUTH_SERVER_UNAVAILABLE,
        AUTH_INVALID_AUDIENCE,
        USER_NOT_FOUND,
        USER_CREATION_FAILED,
        USER_UPDATE_FAILED,
        USER_DELETE_FAILED,
        USER_UNAUTHORIZED,
        USER_ALREADY_EXISTS,
        USER_EMAIL_EXISTS,
        USER_PHONE_EXISTS,
        USER_NOT_REGISTERED,
        ORDER_NOT_FOUND,
        ORDER_ITEM_NOT_FOUND,
        ORDER_CREATION_FAILED,
        ORDER_UPDATE_FAILED,
        ORDER_DELETE_FAILED,
        ORDER_CANCEL_FAILED,
        ORDER_STATUS_INVALID,
        ORDER_PAYMENT_FAILED,
        ORDER_UNAUTHORIZED_ACCESS,
        ORDER_ALREADY_CANCELLED,
        ROLE_NOT_FOUND,
        ROLE_ASSIGNMENT_FAILED,
        ROLE_REVOCATION_FAILED,
        STREAM_UNAVAILABLE,
        STREAM_NOT_FOUND,
        MESSAGE_PUBLISH_FAILED,
        MESSAGE_INVALID,
    ];
}

pub mod success {
    use super::SuccessCode;

    pub const PRODUCT_ADDED: SuccessCode = SuccessCode::new("PRODUCT_ADDED", "success.product.added", 201);
    pub const PRODUCT_UPDATED: SuccessCode = SuccessCode::new("PRODUCT_UPDATED", "success.product.updated", 200);
    pub const PRODUCT_DELETED: SuccessCode = SuccessCode::new("PRODUCT_DELETED", "success.product.deleted", 200);
    pub const PRODUCT_VARIANTS_UPDATED: SuccessCode = SuccessCode::new("PRODUCT_VARIANTS_UPDATED", "success.product.variants_updated", 200);
    pub const PRODUCT_VARIANTS_DELETED: SuccessCode = SuccessCode::new("PRODUCT_VARIANTS_DELETED", "success.product.variants_deleted", 200);

    pub const CATEGORY_ADDED: SuccessCode = SuccessCode::new("CATEGORY_ADDED", "success.category.added", 201);
    pub const CATEGORY_UPDATED: SuccessCode = SuccessCode::new("CATEGORY_UPDATED", "success.category.updated", 200);
    pub const CATEGORY_DELETED: SuccessCode = SuccessCode::new("CATEGORY_DELETED", "success.category.deleted", 200);
    pub const SUBCATEGORY_ADDED: SuccessCode = SuccessCode::new("SUBCATEGORY_ADDED", "success.subcategory.added", 201);
    pub const SUBCATEGORY_UPDATED: SuccessCode = SuccessCode::new("SUBCATEGORY_UPDATED", "success.subcategory.updated", 200);
    pub const SUBCATEGORY_DELETED: SuccessCode = SuccessCode::new("SUBCATEGORY_DELETED", "success.subcategory.deleted", 200);

    pub const CART_ITEM_ADDED: SuccessCode = SuccessCode::new("CART_ITEM_ADDED", "success.cart.item_added", 200);
    pub const CART_ITEM_REMOVED: SuccessCode = SuccessCode::new("CART_ITEM_REMOVED", "success.cart.item_removed", 200);
    pub const CART_CLEARED: SuccessCode = SuccessCode::new("CART_CLEARED", "success.cart.cleared", 200);
    pub const CART_ITEM_UPDATED: SuccessCode = SuccessCode::new("CART_ITEM_UPDATED", "success.cart.item_updated", 200);

    pub const USER_CREATED: SuccessCode = SuccessCode::new("USER_CREATED", "success.user.created", 201);
    pub const USER_UPDATED: SuccessCode = SuccessCode::new("USER_UPDATED", "success.user.updated", 200);
    pub const USER_DELETED: SuccessCode = SuccessCode::new("USER_DELETED", "success.user.deleted", 200);
    pub const USER_ATTRIBUTE_SET: SuccessCode = SuccessCode::new("USER_ATTRIBUTE_SET", "success.user.attribute_set", 200);
    pub const ROLE_CREATED: SuccessCode = SuccessCode::new("ROLE_CREATED", "success.role.created", 201);
    pub const ROLE_ASSIGNED: SuccessCode = SuccessCode::new("ROLE_ASSIGNED", "success.role.assigned", 200);
    pub const ROLE_REVOKED: SuccessCode = SuccessCode::new("ROLE_REVOKED", "success.role.revoked", 200);

    pub const ADDRESS_ADDED: SuccessCode = SuccessCode::new("ADDRESS_ADDED", "success.address.added", 201);
    pub const ADDRESS_UPDATED: SuccessCode = SuccessCode::new("ADDRESS_UPDATED", "success.address.updated", 200);
    pub const ADDRESS_DELETED: SuccessCode = SuccessCode::new("ADDRESS_DELETED", "success.address.deleted", 200);

    pub const ORDER_CREATED: SuccessCode = SuccessCode::new("ORDER_CREATED", "success.order.created", 201);
    pub const ORDER_UPDATED: SuccessCode = SuccessCode::new("ORDER_UPDATED", "success.order.updated", 200);
    pub const ORDER_CANCELLED: SuccessCode = SuccessCode::new("ORDER_CANCELLED", "success.order.cancelled", 200);
    pub const ORDER_DELETED: SuccessCode = SuccessCode::new("ORDER_DELETED", "success.order.deleted", 200);
    pub const ORDER_STATUS_CHANGED: SuccessCode = SuccessCode::new("ORDER_STATUS_CHANGED", "success.order.status_changed", 200);

    pub const MESSAGE_SENT: SuccessCode = SuccessCode::new("MESSAGE_SENT", "success.message.sent", 202);

    /// Every success code, for catalog checks.
    pub const ALL: &[SuccessCode] = &[
        PRODUCT_ADDED,
        PRODUCT_UPDATED,
        PRODUCT_DELETED,
        PRODUCT_VARIANTS_UPDATED,
        PRODUCT_VARIANTS_DELETED,
        CATEGORY_ADDED,
        CATEGORY_UPDATED,
        CATEGORY_DELETED,
        SUBCATEGORY_ADDED,
        SUBCATEGORY_UPDATED,
        SUBCATEGORY_DELETED,
        CART_ITEM_ADDED,
        CART_ITEM_REMOVED,
        CART_CLEARED,
        CART_ITEM_UPDATED,
        USER_CREATED,
        USER_UPDATED,
        USER_DELETED,
        USER_ATTRIBUTE_SET,
        ROLE_CREATED,
        ROLE_ASSIGNED,
        ROLE_REVOKED,
        ADDRESS_ADDED,
        ADDRESS_UPDATED,
        ADDRESS_DELETED,
        ORDER_CREATED,
        ORDER_UPDATED,
        ORDER_CANCELLED,
        ORDER_DELETED,
        ORDER_STATUS_CHANGED,
        MESSAGE_SENT,
    ];
}
