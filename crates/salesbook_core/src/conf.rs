//! Column names, sentinel labels and default column presets.

/// Identifying key joined against the classification book.
pub const COL_SUPPLIER_ARTICLE: &str = "Артикул поставщика";
/// Payment reason / category column.
pub const COL_PAYMENT_REASON: &str = "Обоснование для оплаты";
/// Size column, last partition key of the logistics view.
pub const COL_SIZE: &str = "Размер";
/// Sale date column, final tie-breaker of the logistics view.
pub const COL_SALE_DATE: &str = "Дата продажи";
/// Delivery services cost, summed per logistics partition.
pub const COL_DELIVERY_SERVICES: &str = "Услуги по доставке товара покупателю";

/// Prepended classification group column.
pub const COL_GROUP: &str = "Group";
/// Prepended classification color column.
pub const COL_COLOR: &str = "Color";

/// Classification sentinel for unmatched keys and missing fields.
pub const LABEL_UNKNOWN: &str = "Unknown";
/// Reason value for sale rows.
pub const REASON_SALE: &str = "Продажа";
/// Reason value for logistics rows.
pub const REASON_LOGISTICS: &str = "Логистика";
/// Reason labels that always lead the reason order, in this order.
pub const TUP_REASON_PRIORITY: [&str; 2] = [REASON_SALE, REASON_LOGISTICS];
/// Identifying-key text placed on subtotal rows.
pub const LABEL_TOTAL_KEY: &str = "ИТОГО";
/// Reason text placed on subtotal rows.
pub const LABEL_TOTAL_REASON: &str = "Сумма";

/// Sheet name of the untouched source table.
pub const SHEET_ORIGINAL: &str = "Оригинальный отчет";
/// Sheet name of the projected source table.
pub const SHEET_SHORT: &str = "Short";
/// Sheet name of the classified and sorted table.
pub const SHEET_GROUPED: &str = "Grouped";
/// Sheet name of the logistics view with subtotals.
pub const SHEET_LOGISTICS: &str = "Логистика";

/// Default column layout of the logistics view.
pub const TUP_LOGISTICS_COLUMNS: [&str; 19] = [
    COL_GROUP,
    COL_COLOR,
    COL_SUPPLIER_ARTICLE,
    COL_SIZE,
    COL_PAYMENT_REASON,
    COL_DELIVERY_SERVICES,
    "Дата заказа покупателем",
    COL_SALE_DATE,
    "Виды логистики, штрафов и корректировок ВВ",
    "Количество доставок",
    "Количество возврата",
    "Склад",
    "Наименование офиса доставки",
    "Srid",
    "Код маркировки",
    "Страна",
    "Фиксированный коэффициент склада по поставке",
    "Дата начала действия фиксации",
    "Дата конца действия фиксации",
];

/// Partition keys of the logistics subtotal step.
pub const TUP_LOGISTICS_PARTITION_KEYS: [&str; 3] = [COL_GROUP, COL_COLOR, COL_SIZE];

/// Build the default logistics column list.
pub fn derive_default_logistics_columns() -> Vec<String> {
    TUP_LOGISTICS_COLUMNS.iter().map(ToString::to_string).collect()
}
