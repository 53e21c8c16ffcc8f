use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};

use super::{CreditMode, LeaveQuery, Store, StoreError, StoreTx};
use crate::model::approval::{ApprovalRecord, ApproverRole, RequestKind, RequestStatus};
use crate::model::attendance::Attendance;
use crate::model::calendar::{Holiday, WeeklyOff, weekday_from_index};
use crate::model::comp_off::{CompOffGrant, GrantDraft, GrantStatus};
use crate::model::correction::{AttendanceCorrection, NewCorrection};
use crate::model::leave_request::{LeaveDraft, LeaveRequest};
use crate::model::period::YearMonth;
use crate::model::reimbursement::{NewReimbursement, Reimbursement};
use crate::model::role::Role;
use crate::model::user::User;

const USER_COLUMNS: &str = "id, username, role_id, is_active, leave_balance, comp_off_balance, \
                            last_leave_credit_period";
const LEAVE_COLUMNS: &str = "id, owner_id, leave_type, start_date, end_date, reason, status, \
                             rejection_reason, admin_deleted, employee_deleted, \
                             responsible_person_id, auto_absence_date, created_at";
const GRANT_COLUMNS: &str = "id, user_id, work_date, duration, status, source, note, granted_by";
const CORRECTION_COLUMNS: &str = "id, user_id, date, check_in, check_out, witness_id, reason, \
                                  status, decided_by, decision_reason";

/// MySQL duplicate-key SQLSTATE.
const DUPLICATE_KEY: &str = "23000";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

impl Store for MySqlStore {
    type Tx<'a>
        = MySqlTx
    where
        Self: 'a;

    async fn begin(&self) -> Result<Self::Tx<'_>, StoreError> {
        Ok(MySqlTx {
            tx: self.pool.begin().await?,
        })
    }
}

pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

fn parse<T: FromStr>(column: &str, value: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("{column} = `{value}`")))
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    username: String,
    role_id: u8,
    is_active: bool,
    leave_balance: f64,
    comp_off_balance: f64,
    last_leave_credit_period: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_id(row.role_id)
            .ok_or_else(|| StoreError::Corrupt(format!("users.role_id = {}", row.role_id)))?;
        let last_leave_credit_period = row
            .last_leave_credit_period
            .as_deref()
            .map(|marker| parse::<YearMonth>("users.last_leave_credit_period", marker))
            .transpose()?;
        Ok(User {
            id: row.id,
            username: row.username,
            role,
            is_active: row.is_active,
            leave_balance: row.leave_balance,
            comp_off_balance: row.comp_off_balance,
            last_leave_credit_period,
        })
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    owner_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: Option<String>,
    status: String,
    rejection_reason: Option<String>,
    admin_deleted: bool,
    employee_deleted: bool,
    responsible_person_id: Option<u64>,
    auto_absence_date: Option<NaiveDate>,
    created_at: NaiveDateTime,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            id: row.id,
            owner_id: row.owner_id,
            leave_type: parse("leave_requests.leave_type", &row.leave_type)?,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            status: parse("leave_requests.status", &row.status)?,
            rejection_reason: row.rejection_reason,
            admin_deleted: row.admin_deleted,
            employee_deleted: row.employee_deleted,
            responsible_person_id: row.responsible_person_id,
            auto_absence_date: row.auto_absence_date,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ApprovalRow {
    request_kind: String,
    request_id: u64,
    approver_id: u64,
    approver_role: String,
    status: String,
    acted_at: Option<NaiveDateTime>,
    reason: Option<String>,
}

impl TryFrom<ApprovalRow> for ApprovalRecord {
    type Error = StoreError;

    fn try_from(row: ApprovalRow) -> Result<Self, Self::Error> {
        Ok(ApprovalRecord {
            request_kind: parse("approval_records.request_kind", &row.request_kind)?,
            request_id: row.request_id,
            approver_id: row.approver_id,
            approver_role: parse("approval_records.approver_role", &row.approver_role)?,
            status: parse("approval_records.status", &row.status)?,
            acted_at: row.acted_at,
            reason: row.reason,
        })
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    user_id: u64,
    date: NaiveDate,
    status: String,
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
}

impl TryFrom<AttendanceRow> for Attendance {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(Attendance {
            user_id: row.user_id,
            date: row.date,
            status: parse("attendance.status", &row.status)?,
            check_in: row.check_in,
            check_out: row.check_out,
        })
    }
}

#[derive(FromRow)]
struct WeeklyOffRow {
    weekday: Option<u8>,
    off_date: Option<NaiveDate>,
}

impl TryFrom<WeeklyOffRow> for WeeklyOff {
    type Error = StoreError;

    fn try_from(row: WeeklyOffRow) -> Result<Self, Self::Error> {
        match (row.weekday.and_then(weekday_from_index), row.off_date) {
            (Some(weekday), None) => Ok(WeeklyOff::Fixed(weekday)),
            (None, Some(date)) => Ok(WeeklyOff::OneOff(date)),
            _ => Err(StoreError::Corrupt(
                "weekly_offs needs exactly one of weekday / off_date".to_string(),
            )),
        }
    }
}

#[derive(FromRow)]
struct GrantRow {
    id: u64,
    user_id: u64,
    work_date: NaiveDate,
    duration: f64,
    status: String,
    source: String,
    note: Option<String>,
    granted_by: Option<u64>,
}

impl TryFrom<GrantRow> for CompOffGrant {
    type Error = StoreError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        Ok(CompOffGrant {
            id: row.id,
            user_id: row.user_id,
            work_date: row.work_date,
            duration: row.duration,
            status: parse("comp_off_grants.status", &row.status)?,
            source: parse("comp_off_grants.source", &row.source)?,
            note: row.note,
            granted_by: row.granted_by,
        })
    }
}

#[derive(FromRow)]
struct ReimbursementRow {
    id: u64,
    owner_id: u64,
    amount: f64,
    category: String,
    description: String,
    expense_date: NaiveDate,
    status: String,
    rejection_reason: Option<String>,
    created_at: NaiveDateTime,
}

impl TryFrom<ReimbursementRow> for Reimbursement {
    type Error = StoreError;

    fn try_from(row: ReimbursementRow) -> Result<Self, Self::Error> {
        Ok(Reimbursement {
            id: row.id,
            owner_id: row.owner_id,
            amount: row.amount,
            category: row.category,
            description: row.description,
            expense_date: row.expense_date,
            status: parse("reimbursements.status", &row.status)?,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct CorrectionRow {
    id: u64,
    user_id: u64,
    date: NaiveDate,
    check_in: NaiveTime,
    check_out: NaiveTime,
    witness_id: u64,
    reason: String,
    status: String,
    decided_by: Option<u64>,
    decision_reason: Option<String>,
}

impl TryFrom<CorrectionRow> for AttendanceCorrection {
    type Error = StoreError;

    fn try_from(row: CorrectionRow) -> Result<Self, Self::Error> {
        Ok(AttendanceCorrection {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            check_in: row.check_in,
            check_out: row.check_out,
            witness_id: row.witness_id,
            reason: row.reason,
            status: parse("attendance_corrections.status", &row.status)?,
            decided_by: row.decided_by,
            decision_reason: row.decision_reason,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

impl StoreTx for MySqlTx {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn lock_user(&mut self, user_id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? FOR UPDATE");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn user(&mut self, user_id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn active_staff(&mut self) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE is_active = TRUE AND role_id NOT IN (?, ?) ORDER BY id"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Role::Admin.id())
            .bind(Role::Hr.id())
            .fetch_all(&mut *self.tx)
            .await?;
        convert_all(rows)
    }

    async fn apply_leave_credit(
        &mut self,
        user_id: u64,
        expected: Option<YearMonth>,
        next: YearMonth,
        mode: CreditMode,
    ) -> Result<bool, StoreError> {
        let (sql, amount) = match mode {
            CreditMode::Add(amount) => (
                r#"
                UPDATE users
                SET leave_balance = leave_balance + ?, last_leave_credit_period = ?
                WHERE id = ? AND last_leave_credit_period <=> ?
                "#,
                amount,
            ),
            CreditMode::Reset(amount) => (
                r#"
                UPDATE users
                SET leave_balance = ?, last_leave_credit_period = ?
                WHERE id = ? AND last_leave_credit_period <=> ?
                "#,
                amount,
            ),
        };

        let result = sqlx::query(sql)
            .bind(amount)
            .bind(next.to_string())
            .bind(user_id)
            .bind(expected.map(|marker| marker.to_string()))
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn adjust_leave_balance(&mut self, user_id: u64, delta: f64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET leave_balance = leave_balance + ?
            WHERE id = ? AND leave_balance + ? >= 0
            "#,
        )
        .bind(delta)
        .bind(user_id)
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn adjust_comp_off_balance(
        &mut self,
        user_id: u64,
        delta: f64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET comp_off_balance = comp_off_balance + ?
            WHERE id = ? AND comp_off_balance + ? >= 0
            "#,
        )
        .bind(delta)
        .bind(user_id)
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn departments_of(&mut self, user_id: u64) -> Result<Vec<u64>, StoreError> {
        let ids = sqlx::query_scalar::<_, u64>(
            "SELECT department_id FROM department_members WHERE user_id = ? ORDER BY department_id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn department_managers(&mut self, department_id: u64) -> Result<Vec<u64>, StoreError> {
        let ids = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT dm.user_id
            FROM department_managers dm
            JOIN users u ON u.id = dm.user_id
            WHERE dm.department_id = ? AND u.is_active = TRUE
            ORDER BY dm.user_id
            "#,
        )
        .bind(department_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn managed_departments(&mut self, user_id: u64) -> Result<Vec<u64>, StoreError> {
        let ids = sqlx::query_scalar::<_, u64>(
            "SELECT department_id FROM department_managers WHERE user_id = ? ORDER BY department_id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn insert_leave(&mut self, draft: &LeaveDraft) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (owner_id, leave_type, start_date, end_date, reason, status,
                 responsible_person_id, auto_absence_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(draft.owner_id)
        .bind(draft.leave_type.as_ref())
        .bind(draft.span.start)
        .bind(draft.span.end)
        .bind(draft.reason.as_deref())
        .bind(draft.status.as_ref())
        .bind(draft.responsible_person_id)
        .bind(draft.auto_absence_date)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn insert_auto_absence(&mut self, draft: &LeaveDraft) -> Result<Option<u64>, StoreError> {
        match self.insert_leave(draft).await {
            Ok(id) => Ok(Some(id)),
            Err(StoreError::Database(sqlx::Error::Database(db_err)))
                if db_err.code().as_deref() == Some(DUPLICATE_KEY) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn lock_leave(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE");
        sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn save_leave(&mut self, leave: &LeaveRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE leave_requests
            SET owner_id = ?, leave_type = ?, start_date = ?, end_date = ?, reason = ?,
                status = ?, rejection_reason = ?, admin_deleted = ?, employee_deleted = ?,
                responsible_person_id = ?
            WHERE id = ?
            "#,
        )
        .bind(leave.owner_id)
        .bind(leave.leave_type.as_ref())
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(leave.reason.as_deref())
        .bind(leave.status.as_ref())
        .bind(leave.rejection_reason.as_deref())
        .bind(leave.admin_deleted)
        .bind(leave.employee_deleted)
        .bind(leave.responsible_person_id)
        .bind(leave.id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn leaves_of(
        &mut self,
        owner_id: u64,
        statuses: &[RequestStatus],
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests
            WHERE owner_id = ?
              AND admin_deleted = FALSE
              AND employee_deleted = FALSE
              AND status IN ({placeholders})
            ORDER BY start_date
            "#
        );
        let mut query = sqlx::query_as::<_, LeaveRow>(&sql).bind(owner_id);
        for status in statuses {
            query = query.bind(status.as_ref());
        }
        let rows = query.fetch_all(&mut *self.tx).await?;
        convert_all(rows)
    }

    async fn list_leaves(
        &mut self,
        query: &LeaveQuery,
    ) -> Result<(Vec<LeaveRequest>, i64), StoreError> {
        let mut where_sql = String::from(" WHERE admin_deleted = FALSE");
        let mut args: Vec<FilterValue> = Vec::new();

        if query.hide_employee_deleted {
            where_sql.push_str(" AND employee_deleted = FALSE");
        }
        if let Some(owner_id) = query.owner_id {
            where_sql.push_str(" AND owner_id = ?");
            args.push(FilterValue::U64(owner_id));
        }
        if let Some(status) = query.status.as_ref() {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.as_ref()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&mut *self.tx).await?;

        let data_sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests
            {where_sql}
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let mut data_q = sqlx::query_as::<_, LeaveRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }
        let rows = data_q
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok((convert_all(rows)?, total))
    }

    async fn insert_approval(&mut self, record: &ApprovalRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO approval_records
                (request_kind, request_id, approver_id, approver_role, status, acted_at, reason)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.request_kind.as_ref())
        .bind(record.request_id)
        .bind(record.approver_id)
        .bind(record.approver_role.as_ref())
        .bind(record.status.as_ref())
        .bind(record.acted_at)
        .bind(record.reason.as_deref())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn approvals(
        &mut self,
        kind: RequestKind,
        request_id: u64,
    ) -> Result<Vec<ApprovalRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ApprovalRow>(
            r#"
            SELECT request_kind, request_id, approver_id, approver_role, status, acted_at, reason
            FROM approval_records
            WHERE request_kind = ? AND request_id = ?
            ORDER BY approver_id
            "#,
        )
        .bind(kind.as_ref())
        .bind(request_id)
        .fetch_all(&mut *self.tx)
        .await?;
        convert_all(rows)
    }

    async fn upsert_vote(
        &mut self,
        kind: RequestKind,
        request_id: u64,
        approver_id: u64,
        role: ApproverRole,
        status: RequestStatus,
        reason: Option<&str>,
        acted_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO approval_records
                (request_kind, request_id, approver_id, approver_role, status, acted_at, reason)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                acted_at = VALUES(acted_at),
                reason = VALUES(reason)
            "#,
        )
        .bind(kind.as_ref())
        .bind(request_id)
        .bind(approver_id)
        .bind(role.as_ref())
        .bind(status.as_ref())
        .bind(acted_at)
        .bind(reason)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_reimbursement(
        &mut self,
        owner_id: u64,
        claim: &NewReimbursement,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO reimbursements (owner_id, amount, category, description, expense_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner_id)
        .bind(claim.amount)
        .bind(claim.category.trim())
        .bind(claim.description.trim())
        .bind(claim.expense_date)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn lock_reimbursement(&mut self, id: u64) -> Result<Option<Reimbursement>, StoreError> {
        sqlx::query_as::<_, ReimbursementRow>(
            r#"
            SELECT id, owner_id, amount, category, description, expense_date, status,
                   rejection_reason, created_at
            FROM reimbursements
            WHERE id = ?
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .map(Reimbursement::try_from)
        .transpose()
    }

    async fn set_reimbursement_status(
        &mut self,
        id: u64,
        status: RequestStatus,
        rejection_reason: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE reimbursements SET status = ?, rejection_reason = ? WHERE id = ?")
            .bind(status.as_ref())
            .bind(rejection_reason)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn attendance(
        &mut self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, StoreError> {
        sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT user_id, date, status, check_in, check_out
            FROM attendance
            WHERE user_id = ? AND date = ?
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&mut *self.tx)
        .await?
        .map(Attendance::try_from)
        .transpose()
    }

    async fn attendance_on(&mut self, date: NaiveDate) -> Result<Vec<Attendance>, StoreError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            "SELECT user_id, date, status, check_in, check_out FROM attendance WHERE date = ?",
        )
        .bind(date)
        .fetch_all(&mut *self.tx)
        .await?;
        convert_all(rows)
    }

    async fn upsert_attendance(&mut self, record: &Attendance) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO attendance (user_id, date, status, check_in, check_out)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                check_in = VALUES(check_in),
                check_out = VALUES(check_out)
            "#,
        )
        .bind(record.user_id)
        .bind(record.date)
        .bind(record.status.as_ref())
        .bind(record.check_in)
        .bind(record.check_out)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn holidays_between(
        &mut self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError> {
        let rows = sqlx::query_as::<_, (NaiveDate, String)>(
            "SELECT date, title FROM holidays WHERE date BETWEEN ? AND ? ORDER BY date",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(date, title)| Holiday { date, title })
            .collect())
    }

    async fn weekly_offs(&mut self, user_id: u64) -> Result<Vec<WeeklyOff>, StoreError> {
        let rows = sqlx::query_as::<_, WeeklyOffRow>(
            "SELECT weekday, off_date FROM weekly_offs WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        convert_all(rows)
    }

    async fn insert_grant(&mut self, draft: &GrantDraft) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO comp_off_grants
                (user_id, work_date, duration, status, source, note, granted_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(draft.user_id)
        .bind(draft.work_date)
        .bind(draft.duration)
        .bind(GrantStatus::Active.as_ref())
        .bind(draft.source.as_ref())
        .bind(draft.note.as_deref())
        .bind(draft.granted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn grant_exists(&mut self, user_id: u64, work_date: NaiveDate) -> Result<bool, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM comp_off_grants
            WHERE user_id = ? AND work_date = ? AND status = ?
            "#,
        )
        .bind(user_id)
        .bind(work_date)
        .bind(GrantStatus::Active.as_ref())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count > 0)
    }

    async fn lock_grant(&mut self, id: u64) -> Result<Option<CompOffGrant>, StoreError> {
        let sql = format!("SELECT {GRANT_COLUMNS} FROM comp_off_grants WHERE id = ? FOR UPDATE");
        sqlx::query_as::<_, GrantRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(CompOffGrant::try_from)
            .transpose()
    }

    async fn mark_grant_deleted(&mut self, id: u64) -> Result<(), StoreError> {
        sqlx::query("UPDATE comp_off_grants SET status = ? WHERE id = ?")
            .bind(GrantStatus::Deleted.as_ref())
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn grants_of(&mut self, user_id: u64) -> Result<Vec<CompOffGrant>, StoreError> {
        let sql = format!(
            "SELECT {GRANT_COLUMNS} FROM comp_off_grants WHERE user_id = ? ORDER BY work_date DESC"
        );
        let rows = sqlx::query_as::<_, GrantRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?;
        convert_all(rows)
    }

    async fn insert_correction(
        &mut self,
        user_id: u64,
        correction: &NewCorrection,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_corrections
                (user_id, date, check_in, check_out, witness_id, reason)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(correction.date)
        .bind(correction.check_in)
        .bind(correction.check_out)
        .bind(correction.witness_id)
        .bind(correction.reason.trim())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn lock_correction(
        &mut self,
        id: u64,
    ) -> Result<Option<AttendanceCorrection>, StoreError> {
        let sql = format!(
            "SELECT {CORRECTION_COLUMNS} FROM attendance_corrections WHERE id = ? FOR UPDATE"
        );
        sqlx::query_as::<_, CorrectionRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(AttendanceCorrection::try_from)
            .transpose()
    }

    async fn save_correction(&mut self, correction: &AttendanceCorrection) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE attendance_corrections
            SET status = ?, decided_by = ?, decision_reason = ?
            WHERE id = ?
            "#,
        )
        .bind(correction.status.as_ref())
        .bind(correction.decided_by)
        .bind(correction.decision_reason.as_deref())
        .bind(correction.id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}
