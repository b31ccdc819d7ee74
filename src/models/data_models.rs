/// Column names of the sales line-item table.
pub mod sales {
    pub const ORDER_DETAILS_ID: &str = "order_details_id";
    pub const ORDER_ID: &str = "order_id";
    pub const PIZZA_ID: &str = "pizza_id";
    pub const ORDER_DATE: &str = "order_date";
    pub const ORDER_TIME: &str = "order_time";
    pub const PIZZA_NAME: &str = "pizza_name";
    pub const PIZZA_CATEGORY_ID: &str = "pizza_category_id";
    pub const PIZZA_SIZE_ID: &str = "pizza_size_id";
    pub const PIZZA_INGREDIENTS: &str = "pizza_ingredients";
    pub const QUANTITY: &str = "quantity";
    pub const UNIT_PRICE: &str = "unit_price";
    pub const TOTAL_PRICE: &str = "total_price";

    /// Columns every sales file must carry.
    pub const REQUIRED: [&str; 10] = [
        ORDER_DETAILS_ID,
        ORDER_ID,
        ORDER_DATE,
        PIZZA_NAME,
        PIZZA_CATEGORY_ID,
        PIZZA_SIZE_ID,
        PIZZA_INGREDIENTS,
        QUANTITY,
        UNIT_PRICE,
        TOTAL_PRICE,
    ];
}

/// Column names of the size reference table.
pub mod size {
    pub const ID: &str = super::sales::PIZZA_SIZE_ID;
    pub const LABEL: &str = "pizza_size";

    pub const REQUIRED: [&str; 2] = [ID, LABEL];
}

/// Column names of the category reference table.
pub mod category {
    pub const ID: &str = super::sales::PIZZA_CATEGORY_ID;
    pub const LABEL: &str = "category";

    pub const REQUIRED: [&str; 2] = [ID, LABEL];
}
