//! ACCOUNT database entities: application users, their account types, and the personal
//! finance ledger (categories, budgets, expenses, incomes, saving goals, savings).
//!
//! The finance tables point at `account.id` as their owning user.

use crate::backend::storage::{Column, ColumnKind, EntityDescriptor, PhysicalDatabase};

use ColumnKind::{Boolean, Date, Enumeration, Integer, Text, Time};

pub static ACCOUNT_TYPE: EntityDescriptor = EntityDescriptor {
    identifier: "account_type",
    type_name: "AccountType",
    database: PhysicalDatabase::Account,
    table_name: "acc_type",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("type_name", Text(Some(50))).unique(),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static ACCOUNT: EntityDescriptor = EntityDescriptor {
    identifier: "account",
    type_name: "Account",
    database: PhysicalDatabase::Account,
    table_name: "account",
    columns: &[
        Column::new("id", Integer).optional(),
        Column::new("acc_name", Text(Some(50))).unique(),
        Column::new("acc_pwd", Text(Some(256)))
            .optional()
            .default_sql("'shopend'"),
        Column::new("acc_type", Integer)
            .optional()
            .default_sql("3")
            .references("acc_type", "id"),
        Column::new("is_active", Boolean).optional().default_sql("1"),
        Column::created_at("datetime"),
    ],
    primary_key: &["id"],
    auto_increment: true,
    computed: &[],
};

pub static CATEGORY: EntityDescriptor = EntityDescriptor {
    identifier: "category",
    type_name: "Category",
    database: PhysicalDatabase::Account,
    table_name: "category",
    columns: &[
        Column::new("CategoryID", Integer).optional(),
        Column::new("Name", Text(Some(100))),
        Column::new("Type", Enumeration(&["Expense", "Income"])),
        Column::new("Description", Text(Some(255))).optional().nullable(),
        Column::created_at("CreatedAt"),
        Column::created_at("UpdatedAt"),
    ],
    primary_key: &["CategoryID"],
    auto_increment: true,
    computed: &[],
};

pub static BUDGET: EntityDescriptor = EntityDescriptor {
    identifier: "budget",
    type_name: "Budget",
    database: PhysicalDatabase::Account,
    table_name: "budget",
    columns: &[
        Column::new("BudgetID", Integer).optional(),
        Column::new("UserID", Integer).references("account", "id"),
        Column::new("Amount", Integer),
        Column::new("Start", Date),
        Column::new("End", Date),
        Column::new("CategoryID", Integer)
            .optional()
            .nullable()
            .references("category", "CategoryID"),
        Column::new("Description", Text(None)).optional().nullable(),
        Column::created_at("CreatedAt"),
        Column::created_at("UpdatedAt"),
    ],
    primary_key: &["BudgetID"],
    auto_increment: true,
    computed: &[],
};

pub static EXPENSE: EntityDescriptor = EntityDescriptor {
    identifier: "expense",
    type_name: "Expense",
    database: PhysicalDatabase::Account,
    table_name: "expense",
    columns: &[
        Column::new("ExpenseID", Integer).optional(),
        Column::new("UserID", Integer).references("account", "id"),
        Column::new("CategoryID", Integer).references("category", "CategoryID"),
        Column::new("Description", Text(None)).optional().nullable(),
        Column::new("Amount", Integer),
        Column::new("Date", Date),
        Column::new("Time", Time),
        Column::new("BudgetID", Integer)
            .optional()
            .nullable()
            .references("budget", "BudgetID"),
        Column::new("Recurring", Boolean)
            .optional()
            .nullable()
            .default_sql("0"),
        Column::created_at("CreatedAt"),
        Column::created_at("UpdatedAt"),
    ],
    primary_key: &["ExpenseID"],
    auto_increment: true,
    computed: &[],
};

pub static INCOME: EntityDescriptor = EntityDescriptor {
    identifier: "income",
    type_name: "Income",
    database: PhysicalDatabase::Account,
    table_name: "income",
    columns: &[
        Column::new("IncomeID", Integer).optional(),
        Column::new("UserID", Integer).references("account", "id"),
        Column::new("CategoryID", Integer).references("category", "CategoryID"),
        Column::new("Description", Text(None)).optional().nullable(),
        Column::new("Amount", Integer),
        Column::new("Date", Date),
        Column::new("Time", Time),
        Column::created_at("CreatedAt"),
        Column::created_at("UpdatedAt"),
    ],
    primary_key: &["IncomeID"],
    auto_increment: true,
    computed: &[],
};

pub static SAVING_GOAL: EntityDescriptor = EntityDescriptor {
    identifier: "saving_goal",
    type_name: "SavingGoal",
    database: PhysicalDatabase::Account,
    table_name: "saving_goal",
    columns: &[
        Column::new("SavingGoalID", Integer).optional(),
        Column::new("UserID", Integer).references("account", "id"),
        Column::new("Target", Integer),
        Column::new("DateLimit", Date),
        Column::new("Description", Text(None)).optional().nullable(),
        Column::created_at("CreatedAt"),
        Column::created_at("UpdatedAt"),
    ],
    primary_key: &["SavingGoalID"],
    auto_increment: true,
    computed: &[],
};

pub static SAVING: EntityDescriptor = EntityDescriptor {
    identifier: "saving",
    type_name: "Saving",
    database: PhysicalDatabase::Account,
    table_name: "saving",
    columns: &[
        Column::new("SavingID", Integer).optional(),
        Column::new("UserID", Integer).references("account", "id"),
        Column::new("SavingGoalID", Integer)
            .optional()
            .nullable()
            .references("saving_goal", "SavingGoalID"),
        Column::new("Amount", Integer),
        Column::new("Date", Date),
        Column::new("Location", Text(None)).optional().nullable(),
        Column::new("Description", Text(None)).optional().nullable(),
        Column::created_at("CreatedAt"),
        Column::created_at("UpdatedAt"),
    ],
    primary_key: &["SavingID"],
    auto_increment: true,
    computed: &[],
};

/// ACCOUNT entities in creation order (referenced tables first)
pub fn entities() -> [&'static EntityDescriptor; 8] {
    [
        &ACCOUNT_TYPE,
        &ACCOUNT,
        &CATEGORY,
        &BUDGET,
        &EXPENSE,
        &INCOME,
        &SAVING_GOAL,
        &SAVING,
    ]
}
