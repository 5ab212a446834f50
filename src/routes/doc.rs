use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{
            AddToCartRequest, AddToCartResponse, CartItemRemoved, CartItemUpdated, CartView,
            UpdateCartItemRequest,
        },
        orders::{OrderList, OrderWithItems, PlaceOrderRequest},
        payment::{CheckoutRequest, CheckoutResponse, PaymentCallback},
        products::{AddReviewRequest, CreateProductRequest, ProductList, UpdateProductRequest},
    },
    gateway::GatewayRedirect,
    pricing::Selection,
    models::{
        Address, CartLine, ColorVariant, MeasurementOption, Order, OrderItem, OrderStatus,
        PaymentRecord, PriceSource, Product, Review, User,
    },
    response::{ApiResponse, ErrorData, Meta},
    routes::{admin, auth, cart, health, orders, params, payment, products as product_routes},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::toggle_product,
        product_routes::delete_product,
        product_routes::add_review,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_cart_item,
        payment::checkout,
        payment::payment_callback,
        orders::list_my_orders,
        orders::place_order,
        orders::get_order,
        orders::cancel_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
    ),
    components(
        schemas(
            User,
            Product,
            MeasurementOption,
            ColorVariant,
            Review,
            PriceSource,
            Selection,
            CartLine,
            Address,
            PaymentRecord,
            Order,
            OrderItem,
            OrderStatus,
            GatewayRedirect,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AddToCartRequest,
            AddToCartResponse,
            UpdateCartItemRequest,
            CartView,
            CartItemUpdated,
            CartItemRemoved,
            CheckoutRequest,
            CheckoutResponse,
            PaymentCallback,
            PlaceOrderRequest,
            OrderList,
            OrderWithItems,
            CreateProductRequest,
            UpdateProductRequest,
            AddReviewRequest,
            ProductList,
            admin::UpdateOrderStatusRequest,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ErrorData,
            ApiResponse<ErrorData>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Payments", description = "Checkout and gateway callback"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
