//! Initial migration: creates every table in the data model (spec §3).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Media::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Media::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Media::GoogleMediaId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Media::AccountId).string())
                    .col(ColumnDef::new(Media::LocalRelPath).string().not_null())
                    .col(ColumnDef::new(Media::Filename).string().not_null())
                    .col(ColumnDef::new(Media::HashSha256).string().not_null())
                    .col(ColumnDef::new(Media::Bytes).big_integer().not_null())
                    .col(ColumnDef::new(Media::MimeType).string().not_null())
                    .col(ColumnDef::new(Media::Width).integer().not_null())
                    .col(ColumnDef::new(Media::Height).integer().not_null())
                    .col(ColumnDef::new(Media::DurationMs).big_integer())
                    .col(ColumnDef::new(Media::ShotAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Media::ImportedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Media::Orientation).integer())
                    .col(
                        ColumnDef::new(Media::IsVideo)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Media::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Media::HasPlayback)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Media::ThumbnailRelPath).string())
                    .col(ColumnDef::new(Media::CameraMake).string())
                    .col(ColumnDef::new(Media::CameraModel).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_media_hash_sha256")
                    .table(Media::Table)
                    .col(Media::HashSha256)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MediaItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MediaItems::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(MediaItems::GoogleMediaId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MediaItems::Kind).string().not_null())
                    .col(ColumnDef::new(MediaItems::MimeType).string().not_null())
                    .col(ColumnDef::new(MediaItems::Filename).string().not_null())
                    .col(ColumnDef::new(MediaItems::Width).integer().not_null())
                    .col(ColumnDef::new(MediaItems::Height).integer().not_null())
                    .col(ColumnDef::new(MediaItems::PhotoMetadata).json())
                    .col(ColumnDef::new(MediaItems::VideoMetadata).json())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Exif::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Exif::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Exif::MediaId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Exif::Raw).json())
                    .col(ColumnDef::new(Exif::Parsed).json())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Exif::Table, Exif::MediaId)
                            .to(Media::Table, Media::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MediaPlayback::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MediaPlayback::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MediaPlayback::MediaId).big_integer().not_null())
                    .col(ColumnDef::new(MediaPlayback::Preset).string().not_null())
                    .col(ColumnDef::new(MediaPlayback::RelPath).string())
                    .col(ColumnDef::new(MediaPlayback::PosterRelPath).string())
                    .col(ColumnDef::new(MediaPlayback::Width).integer().not_null())
                    .col(ColumnDef::new(MediaPlayback::Height).integer().not_null())
                    .col(ColumnDef::new(MediaPlayback::VideoCodec).string())
                    .col(ColumnDef::new(MediaPlayback::AudioCodec).string())
                    .col(ColumnDef::new(MediaPlayback::Bitrate).big_integer())
                    .col(
                        ColumnDef::new(MediaPlayback::DurationMs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MediaPlayback::Status).string().not_null())
                    .col(ColumnDef::new(MediaPlayback::ErrorMsg).string())
                    .col(
                        ColumnDef::new(MediaPlayback::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MediaPlayback::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MediaPlayback::Table, MediaPlayback::MediaId)
                            .to(Media::Table, Media::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_media_playback_media_preset")
                    .table(MediaPlayback::Table)
                    .col(MediaPlayback::MediaId)
                    .col(MediaPlayback::Preset)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PickerSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PickerSessions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PickerSessions::SessionId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PickerSessions::Status).string().not_null())
                    .col(ColumnDef::new(PickerSessions::AccountId).string())
                    .col(
                        ColumnDef::new(PickerSessions::SelectedCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PickerSessions::LastProgressAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PickerSessions::LastPolledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PickerSessions::Stats).json().not_null())
                    .col(
                        ColumnDef::new(PickerSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PickerSessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PickerSelections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PickerSelections::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PickerSelections::SessionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PickerSelections::GoogleMediaId).string())
                    .col(ColumnDef::new(PickerSelections::LocalFilePath).string())
                    .col(ColumnDef::new(PickerSelections::LocalFilename).string())
                    .col(ColumnDef::new(PickerSelections::Status).string().not_null())
                    .col(
                        ColumnDef::new(PickerSelections::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PickerSelections::EnqueuedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PickerSelections::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PickerSelections::FinishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PickerSelections::Error).string())
                    .col(ColumnDef::new(PickerSelections::MediaId).big_integer())
                    .col(ColumnDef::new(PickerSelections::LockedBy).string())
                    .col(
                        ColumnDef::new(PickerSelections::LockHeartbeatAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(PickerSelections::BaseUrl).string())
                    .col(
                        ColumnDef::new(PickerSelections::BaseUrlValidUntil)
                            .timestamp_with_time_zone(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(PickerSelections::Table, PickerSelections::SessionId)
                            .to(PickerSessions::Table, PickerSessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(PickerSelections::Table, PickerSelections::MediaId)
                            .to(Media::Table, Media::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TaskRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaskRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TaskRecords::TaskName).string().not_null())
                    .col(ColumnDef::new(TaskRecords::ObjectType).string())
                    .col(ColumnDef::new(TaskRecords::ObjectId).string())
                    .col(
                        ColumnDef::new(TaskRecords::ExternalTaskId)
                            .string()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(TaskRecords::Status).string().not_null())
                    .col(ColumnDef::new(TaskRecords::ScheduledFor).timestamp_with_time_zone())
                    .col(ColumnDef::new(TaskRecords::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(TaskRecords::FinishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(TaskRecords::Payload).json().not_null())
                    .col(ColumnDef::new(TaskRecords::Result).json().not_null())
                    .col(ColumnDef::new(TaskRecords::ErrorMessage).string())
                    .col(
                        ColumnDef::new(TaskRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TaskRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_task_records_name_status")
                    .table(TaskRecords::Table)
                    .col(TaskRecords::TaskName)
                    .col(TaskRecords::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaskRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PickerSelections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PickerSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MediaPlayback::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Exif::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MediaItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Media::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Media {
    Table,
    Id,
    GoogleMediaId,
    AccountId,
    LocalRelPath,
    Filename,
    HashSha256,
    Bytes,
    MimeType,
    Width,
    Height,
    DurationMs,
    ShotAt,
    ImportedAt,
    Orientation,
    IsVideo,
    IsDeleted,
    HasPlayback,
    ThumbnailRelPath,
    CameraMake,
    CameraModel,
}

#[derive(DeriveIden)]
enum MediaItems {
    Table,
    Id,
    GoogleMediaId,
    Kind,
    MimeType,
    Filename,
    Width,
    Height,
    PhotoMetadata,
    VideoMetadata,
}

#[derive(DeriveIden)]
enum Exif {
    Table,
    Id,
    MediaId,
    Raw,
    Parsed,
}

#[derive(DeriveIden)]
enum MediaPlayback {
    Table,
    Id,
    MediaId,
    Preset,
    RelPath,
    PosterRelPath,
    Width,
    Height,
    VideoCodec,
    AudioCodec,
    Bitrate,
    DurationMs,
    Status,
    ErrorMsg,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PickerSessions {
    Table,
    Id,
    SessionId,
    Status,
    AccountId,
    SelectedCount,
    LastProgressAt,
    LastPolledAt,
    Stats,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PickerSelections {
    Table,
    Id,
    SessionId,
    GoogleMediaId,
    LocalFilePath,
    LocalFilename,
    Status,
    Attempts,
    EnqueuedAt,
    StartedAt,
    FinishedAt,
    Error,
    MediaId,
    LockedBy,
    LockHeartbeatAt,
    BaseUrl,
    BaseUrlValidUntil,
}

#[derive(DeriveIden)]
enum TaskRecords {
    Table,
    Id,
    TaskName,
    ObjectType,
    ObjectId,
    ExternalTaskId,
    Status,
    ScheduledFor,
    StartedAt,
    FinishedAt,
    Payload,
    Result,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
}
