//! URL を取得して、ステータスとヘッダーとボディのサイズを表示する例
//!
//! 使い方:
//!   cargo run -p http_fetch -- http://example.com/
//!   cargo run -p http_fetch -- --range 0:1024 http://example.com/data.bin
//!   RUST_LOG=debug cargo run -p http_fetch -- --head http://example.com/

use std::time::Duration;

use blocking_http11::{Client, ClientConfig, make_request};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = noargs::raw_args();
    args.metadata_mut().app_name = "http_fetch";

    // --help フラグ
    noargs::HELP_FLAG.take_help(&mut args);

    // --version フラグ
    let version_flag: bool = noargs::flag("version")
        .short('V')
        .doc("Show version")
        .take(&mut args)
        .is_present();
    if version_flag {
        println!("{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let head_flag: bool = noargs::flag("head")
        .doc("Send HEAD instead of GET")
        .take(&mut args)
        .is_present();

    // --range POS:LEN
    let range: Option<(u64, u64)> = noargs::opt("range")
        .short('r')
        .doc("Byte range to request as POS:LEN (LEN 0 reads to the end)")
        .take(&mut args)
        .present_and_then(|o| parse_range(o.value()))
        .map_err(|e| format!("{:?}", e))?;

    let timeout: u64 = noargs::opt("timeout")
        .short('t')
        .doc("Read timeout in seconds")
        .default("30")
        .take(&mut args)
        .then(|o| o.value().parse())
        .map_err(|e| format!("{:?}", e))?;

    // 位置引数: URL
    let url: String = noargs::arg("<URL>")
        .doc("URL to fetch (e.g., http://example.com/)")
        .take(&mut args)
        .then(|a| Ok::<_, &str>(a.value().to_string()))
        .map_err(|e| format!("{:?}", e))?;

    // 未知の引数があればエラー、ヘルプが返されたら表示
    if let Some(help) = args.finish().map_err(|e| format!("{:?}", e))? {
        print!("{}", help);
        return Ok(());
    }

    let config = ClientConfig::default().read_timeout(Some(Duration::from_secs(timeout)));
    let client = Client::with_config(config);

    log::info!("connecting for {}", url);
    let mut conn = client.connect(&url)?;

    let mut request = make_request(&mut conn, &url)?;
    request.add_header("User-Agent", concat!("http_fetch/", env!("CARGO_PKG_VERSION")))?;
    if let Some((pos, len)) = range {
        request.byte_range(pos, len);
    }
    let response = if head_flag {
        request.head()?
    } else {
        request.get()?
    };

    let (status, reason) = response.status();
    println!("{} {} {}", response.version(), status, reason);
    for (name, value) in response.headers().iter() {
        println!("{}: {}", name, value);
    }
    if response.url().to_string() != url {
        println!("(final URL: {})", response.url());
    }
    if let Some((pos, len)) = response.range()? {
        println!("(range {}+{})", pos, len);
    }

    // ボディは読み捨ててサイズだけ表示する
    let mut body = response.body_stream();
    let mut buf = [0u8; 16 * 1024];
    let mut total = 0u64;
    loop {
        let n = body.read(&mut buf)?;
        if n == 0 {
            break;
        }
        total += n as u64;
    }
    println!();
    println!("Body: {} bytes", total);

    Ok(())
}

fn parse_range(value: &str) -> Result<(u64, u64), String> {
    let (pos, len) = value
        .split_once(':')
        .ok_or_else(|| format!("expected POS:LEN, got {:?}", value))?;
    let pos = pos.parse().map_err(|e| format!("invalid position: {}", e))?;
    let len = len.parse().map_err(|e| format!("invalid length: {}", e))?;
    Ok((pos, len))
}
