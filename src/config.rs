//! クライアント設定
//!
//! タイムアウト、試行回数、ヘッダーの制限をまとめる。

use std::time::Duration;

use crate::version::HttpVersion;

/// クライアントの設定
///
/// タイムアウトなどの既定値は外部の設定ストアから供給される想定で、
/// このクレートは値を受け取るだけ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// 接続タイムアウト (デフォルト: 10 秒)
    pub connect_timeout: Duration,
    /// 読み取りタイムアウト (デフォルト: 30 秒、None で無制限)
    pub read_timeout: Option<Duration>,
    /// 書き込みタイムアウト (デフォルト: 15 秒、None で無制限)
    pub write_timeout: Option<Duration>,
    /// リダイレクトとバージョンダウングレードを合わせた最大試行回数 (デフォルト: 5)
    pub max_attempts: usize,
    /// 受信バッファサイズ (デフォルト: 32KB)
    pub read_buffer_size: usize,
    /// ステータス行・ヘッダー行・チャンクサイズ行の最大長 (デフォルト: 8KB)
    pub max_line_size: usize,
    /// 最大ヘッダー数 (デフォルト: 100)
    pub max_headers_count: usize,
    /// キープアライブを要求するか (デフォルト: true)
    pub keep_alive: bool,
    /// 試行回数を使い切ったときにエラーにするか (デフォルト: false)
    ///
    /// false の場合は最後に受信したレスポンスをそのまま返す。
    pub fail_on_redirect_limit: bool,
    /// 新しい接続で使う HTTP バージョン (デフォルト: HTTP/1.1)
    pub version: HttpVersion,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Some(Duration::from_secs(30)),
            write_timeout: Some(Duration::from_secs(15)),
            max_attempts: 5,
            read_buffer_size: 32 * 1024, // 32KB
            max_line_size: 8 * 1024,     // 8KB
            max_headers_count: 100,
            keep_alive: true,
            fail_on_redirect_limit: false,
            version: HttpVersion::HTTP_1_1,
        }
    }
}

impl ClientConfig {
    /// 行長・ヘッダー数・タイムアウトの制限をなくした設定を作成
    pub fn unlimited() -> Self {
        Self {
            read_timeout: None,
            write_timeout: None,
            max_line_size: usize::MAX,
            max_headers_count: usize::MAX,
            ..Self::default()
        }
    }

    /// 接続タイムアウトを設定 (ビルダーパターン)
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// 読み取りタイムアウトを設定 (ビルダーパターン)
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// 書き込みタイムアウトを設定 (ビルダーパターン)
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// HTTP バージョンを設定 (ビルダーパターン)
    pub fn version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }
}
