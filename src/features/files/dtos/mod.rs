mod file_dto;

pub use file_dto::{
    DeleteFileByUrlDto, FileListResponseDto, FileRecordDto, UploadFormDto, UploadResponseDto,
    MAX_FILE_SIZE, MAX_MULTI_FILES, MAX_SINGLE_FILES, UPLOAD_BODY_LIMIT,
};
