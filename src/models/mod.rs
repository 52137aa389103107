mod alert;
mod amount;
mod bill;
mod budget;
mod category;
mod month;
mod stats;
mod user;

pub use alert::{AlertReading, BudgetAlert, NewAlert, TriggeredAlert, MAX_THRESHOLD, MIN_THRESHOLD};
pub use amount::{add_amounts, check_amount, sub_amounts, MAX_AMOUNT};
pub use bill::{Bill, BillFilter, BillPage, NewBill};
pub use budget::{Budget, BudgetUsage, BudgetWithUsage, NewBudget};
pub use category::{Category, EntryType, NewCategory};
pub use month::Month;
pub use stats::{CategoryTotal, DailyTotal, MonthlyStats};
pub use user::{NewUser, User};
