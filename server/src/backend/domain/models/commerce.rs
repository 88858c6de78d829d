//! COMMERCE database entities: catalogue, suppliers and supplies, depots and stock,
//! sales records, payments and deposits.

use serde_json::Value;

use crate::backend::storage::{
    Column, ColumnKind, ComputedColumn, EntityDescriptor, PhysicalDatabase, Record,
};

use ColumnKind::{Boolean, Char, Date, Enumeration, Integer, Text};

fn product(record: &Record, left: &str, right: &str) -> Option<Value> {
    let left = record.get_i64(left)?;
    let right = record.get_i64(right)?;
    left.checked_mul(right).map(Value::from)
}

fn supply_total(record: &Record) -> Option<Value> {
    product(record, "quantity", "unit_cost")
}

fn record_total(record: &Record) -> Option<Value> {
    product(record, "quantity", "amount")
}

pub static ITEM_CATEGORY: EntityDescriptor = EntityDescriptor {
    identifier: "item_cat",
    type_name: "ItemCategory",
    database: PhysicalDatabase::Commerce,
    table_name: "item_cat",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("cat_name", Text(Some(50))).unique(),
        Column::new("cat_desc", Text(None)).optional().nullable(),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static FAMILY: EntityDescriptor = EntityDescriptor {
    identifier: "family",
    type_name: "Family",
    database: PhysicalDatabase::Commerce,
    table_name: "family",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("fam_name", Text(Some(50))).unique(),
        Column::new("fam_desc", Text(None)).optional().nullable(),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static SECTOR: EntityDescriptor = EntityDescriptor {
    identifier: "sector",
    type_name: "Sector",
    database: PhysicalDatabase::Commerce,
    table_name: "sector",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("sec_name", Text(Some(50))).unique(),
        Column::new("sec_desc", Text(None)).optional().nullable(),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static ITEM: EntityDescriptor = EntityDescriptor {
    identifier: "item",
    type_name: "Item",
    database: PhysicalDatabase::Commerce,
    table_name: "item",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("item_name", Text(Some(50))).unique(),
        Column::new("item_cat", Integer)
            .default_sql("1")
            .references("item_cat", "id"),
        Column::new("cost_price", Integer).default_sql("0"),
        Column::new("selling_price", Integer).default_sql("0"),
        Column::new("min_sell_price", Integer).default_sql("0"),
        Column::new("min_order_qty", Integer).default_sql("5"),
        Column::new("family", Integer)
            .default_sql("1")
            .references("family", "id"),
        Column::new("sector", Integer)
            .default_sql("1")
            .references("sector", "id"),
        Column::new("is_active", Boolean).optional().default_sql("1"),
        Column::new("is_metered", Boolean).optional().default_sql("1"),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static BARCODE: EntityDescriptor = EntityDescriptor {
    identifier: "barcode",
    type_name: "Barcode",
    database: PhysicalDatabase::Commerce,
    table_name: "barcode",
    columns: &[
        Column::new("barcode", Text(Some(50))),
        Column::new("item", Integer).references("item", "id"),
    ],
    primary_key: &["barcode"],
    auto_increment: false,
    computed: &[],
};

pub static OPERATION: EntityDescriptor = EntityDescriptor {
    identifier: "operation",
    type_name: "Operation",
    database: PhysicalDatabase::Commerce,
    table_name: "operation",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("op_name", Text(Some(50))).unique(),
        Column::new("op_sign", Char).default_sql("'+'"),
        Column::new("op_desc", Text(None)),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static PAY_MODE: EntityDescriptor = EntityDescriptor {
    identifier: "pay_mode",
    type_name: "PayMode",
    database: PhysicalDatabase::Commerce,
    table_name: "pay_mode",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("mode_name", Text(Some(50))).unique(),
        Column::new("is_active", Boolean).optional().default_sql("1"),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static CLIENT_ACCOUNT: EntityDescriptor = EntityDescriptor {
    identifier: "client_account",
    type_name: "ClientAccount",
    database: PhysicalDatabase::Commerce,
    table_name: "client_account",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("acc_name", Text(Some(50))).unique(),
        Column::new("acc_type", Enumeration(&["Consumer", "Worker", "Both"])),
        Column::new("is_active", Boolean).optional().default_sql("1"),
        Column::new("credit_limit", Integer)
            .optional()
            .default_sql("25000"),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

/// Commerce-side view of an application user. `id` and `acc_type` mirror rows of the
/// ACCOUNT database, which this store cannot reference.
pub static USER_ACCOUNT: EntityDescriptor = EntityDescriptor {
    identifier: "user_account",
    type_name: "UserAccount",
    database: PhysicalDatabase::Commerce,
    table_name: "user_account",
    columns: &[
        Column::new("id", Integer),
        Column::new("acc_type", Integer).default_sql("3"),
        Column::new("is_active", Boolean).default_sql("1"),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: false,
    computed: &[],
};

pub static SUPPLIER_TYPE: EntityDescriptor = EntityDescriptor {
    identifier: "supplier_type",
    type_name: "SupplierType",
    database: PhysicalDatabase::Commerce,
    table_name: "sup_type",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("st_name", Text(Some(50))).unique(),
        Column::new("st_desc", Text(None)),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static SUPPLIER: EntityDescriptor = EntityDescriptor {
    identifier: "supplier",
    type_name: "Supplier",
    database: PhysicalDatabase::Commerce,
    table_name: "supplier",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("sup_name", Text(Some(50))).unique(),
        Column::new("sup_type", Integer).references("sup_type", "id"),
        Column::new("sup_desc", Text(None)).optional().nullable(),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static SUPPLIER_CONTACT: EntityDescriptor = EntityDescriptor {
    identifier: "supplier_contact",
    type_name: "SupplierContact",
    database: PhysicalDatabase::Commerce,
    table_name: "sup_contact",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("con_name", Text(Some(50))).unique(),
        Column::new("con_phone", Text(Some(50))),
        Column::new("con_email", Text(Some(50))),
        Column::new("supplier", Integer).references("supplier", "id"),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static SUPPLY_DETAIL: EntityDescriptor = EntityDescriptor {
    identifier: "supply_detail",
    type_name: "SupplyDetail",
    database: PhysicalDatabase::Commerce,
    table_name: "supply_detail",
    columns: &[
        Column::new("batch", Text(Some(50))),
        Column::new("supplier", Integer)
            .nullable()
            .references("supplier", "id"),
        Column::new("sup_date", Date),
        Column::new("receiver", Integer)
            .nullable()
            .references("client_account", "id"),
        Column::new("ref", Text(Some(50))),
        Column::new("app_user", Integer)
            .nullable()
            .references("user_account", "id"),
        Column::new("is_stocked", Boolean).default_sql("0"),
        Column::new("sup_desc", Text(None)).optional().nullable(),
        Column::created_at("datetime"),
    ],
    primary_key: &["batch"],
    auto_increment: false,
    computed: &[],
};

pub static SUPPLY: EntityDescriptor = EntityDescriptor {
    identifier: "supply",
    type_name: "Supply",
    database: PhysicalDatabase::Commerce,
    table_name: "supply",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("item", Integer).nullable().references("item", "id"),
        Column::new("quantity", Integer),
        Column::new("unit_cost", Integer),
        Column::new("expiry", Date),
        Column::new("batch", Text(Some(50)))
            .nullable()
            .references("supply_detail", "batch"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[ComputedColumn {
        name: "total",
        compute: supply_total,
    }],
};

pub static DEPOT_DETAIL: EntityDescriptor = EntityDescriptor {
    identifier: "depot_detail",
    type_name: "DepotDetail",
    database: PhysicalDatabase::Commerce,
    table_name: "depot_detail",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("depot_name", Text(Some(50))).unique(),
        Column::new("depot_desc", Text(None)),
        Column::new("depot_type", Enumeration(&["Source", "Destination", "Both"])),
        Column::new("is_metered", Boolean).optional().default_sql("1"),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static DEPOT: EntityDescriptor = EntityDescriptor {
    identifier: "depot",
    type_name: "Depot",
    database: PhysicalDatabase::Commerce,
    table_name: "depot",
    columns: &[
        Column::new("depot", Integer).references("depot_detail", "id"),
        Column::new("item_id", Integer).references("item", "id"),
        Column::new("stock", Integer).default_sql("0"),
    ],
    primary_key: &["depot", "item_id"],
    auto_increment: false,
    computed: &[],
};

pub static DEPOT_MAP: EntityDescriptor = EntityDescriptor {
    identifier: "depot_map",
    type_name: "DepotMap",
    database: PhysicalDatabase::Commerce,
    table_name: "depot_map",
    columns: &[
        Column::new("source", Integer).references("depot_detail", "id"),
        Column::new("destination", Integer).references("depot_detail", "id"),
        Column::new("operation", Integer).references("operation", "id"),
    ],
    primary_key: &["source", "destination", "operation"],
    auto_increment: false,
    computed: &[],
};

pub static RECORD_DETAIL: EntityDescriptor = EntityDescriptor {
    identifier: "record_detail",
    type_name: "RecordDetail",
    database: PhysicalDatabase::Commerce,
    table_name: "record_detail",
    columns: &[
        Column::new("batch", Text(Some(50))),
        Column::new("operation", Integer)
            .nullable()
            .references("operation", "id"),
        Column::new("receiver", Integer)
            .nullable()
            .references("client_account", "id"),
        Column::new("source_depot", Integer)
            .nullable()
            .references("depot_detail", "id"),
        Column::new("dest_depot", Integer)
            .nullable()
            .references("depot_detail", "id"),
        Column::new("rec_date", Date),
        Column::new("ref", Text(Some(50))),
        Column::new("app_user", Integer)
            .nullable()
            .references("user_account", "id"),
        Column::new("rec_desc", Text(None)).optional().nullable(),
        Column::created_at("datetime"),
    ],
    primary_key: &["batch"],
    auto_increment: false,
    computed: &[],
};

pub static RECORD: EntityDescriptor = EntityDescriptor {
    identifier: "record",
    type_name: "Record",
    database: PhysicalDatabase::Commerce,
    table_name: "record",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("item", Integer).nullable().references("item", "id"),
        Column::new("quantity", Integer),
        Column::new("source_stock", Integer).optional(),
        Column::new("dest_stock", Integer).optional(),
        Column::new("amount", Integer),
        Column::new("batch", Text(Some(50)))
            .nullable()
            .references("record_detail", "batch"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[ComputedColumn {
        name: "total",
        compute: record_total,
    }],
};

pub static PAYMENT: EntityDescriptor = EntityDescriptor {
    identifier: "payment",
    type_name: "Payment",
    database: PhysicalDatabase::Commerce,
    table_name: "payment",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("invoice", Text(Some(50)))
            .nullable()
            .references("record_detail", "batch"),
        Column::new("amount", Integer),
        Column::new("pay_date", Date),
        Column::new("is_instant", Boolean).optional().default_sql("1"),
        Column::new("mode", Integer)
            .nullable()
            .default_sql("1")
            .references("pay_mode", "id"),
        Column::new("app_user", Integer)
            .optional()
            .nullable()
            .references("user_account", "id"),
        Column::new("pay_desc", Text(None)).optional().nullable(),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static DEPOSIT_DETAIL: EntityDescriptor = EntityDescriptor {
    identifier: "deposit_detail",
    type_name: "DepositDetail",
    database: PhysicalDatabase::Commerce,
    table_name: "deposit_detail",
    columns: &[
        Column::new("batch", Text(Some(50))),
        Column::new("d_date", Date),
        Column::new("app_user", Integer).references("user_account", "id"),
        Column::created_at("datetime"),
    ],
    primary_key: &["batch"],
    auto_increment: false,
    computed: &[],
};

pub static DEPOSIT: EntityDescriptor = EntityDescriptor {
    identifier: "deposit",
    type_name: "Deposit",
    database: PhysicalDatabase::Commerce,
    table_name: "deposit",
    columns: &[
        Column::new("payment", Integer).references("payment", "id"),
        Column::new("batch", Text(Some(50)))
            .nullable()
            .references("deposit_detail", "batch"),
    ],
    primary_key: &["payment"],
    auto_increment: false,
    computed: &[],
};

/// Stock level of one item at the time a batch was taken
pub static INVENTORY_SNAPSHOT: EntityDescriptor = EntityDescriptor {
    identifier: "inventory_snapshot",
    type_name: "InventorySnapshot",
    database: PhysicalDatabase::Commerce,
    table_name: "inventory_snapshot",
    columns: &[
        Column::new("batch", Text(Some(50))),
        Column::new("item_id", Integer),
        Column::new("stock", Integer),
    ],
    primary_key: &["batch", "item_id"],
    auto_increment: false,
    computed: &[],
};

/// COMMERCE entities in creation order (referenced tables first)
pub fn entities() -> [&'static EntityDescriptor; 23] {
    [
        &ITEM_CATEGORY,
        &FAMILY,
        &SECTOR,
        &ITEM,
        &BARCODE,
        &OPERATION,
        &PAY_MODE,
        &CLIENT_ACCOUNT,
        &USER_ACCOUNT,
        &SUPPLIER_TYPE,
        &SUPPLIER,
        &SUPPLIER_CONTACT,
        &SUPPLY_DETAIL,
        &SUPPLY,
        &DEPOT_DETAIL,
        &DEPOT,
        &DEPOT_MAP,
        &RECORD_DETAIL,
        &RECORD,
        &PAYMENT,
        &DEPOSIT_DETAIL,
        &DEPOSIT,
        &INVENTORY_SNAPSHOT,
    ]
}
