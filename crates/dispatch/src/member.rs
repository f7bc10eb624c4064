//! Member lookup. The roster subsystem owns member records; the dispatch
//! engine only reads them.

use sqlx::PgPool;
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::Member;

pub struct MemberService;

impl MemberService {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Member, AppError> {
        let member: Member = sqlx::query_as("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::MemberNotFound(id))?;

        Ok(member)
    }
}
