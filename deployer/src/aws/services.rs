//! Bootstrap script for a Flask application served behind nginx

/// Port the application listens on inside the instance
pub const APP_PORT: u16 = 5000;

/// Path of the application on the instance
pub const APP_PATH: &str = "/home/ubuntu/app.py";

/// Default user data: installs nginx and the application, then proxies port 80 to the app.
pub const BOOTSTRAP_SCRIPT: &str = r#"#!/bin/bash
sudo apt-get update -y
sudo apt-get install -y python3-pip nginx
pip3 install langraph flask
cat <<EOF > /home/ubuntu/app.py
from flask import Flask, request, jsonify
import langraph

app = Flask(__name__)

@app.route('/')
def home():
    return "Welcome to Langraph-powered Website!"

@app.route('/ai', methods=['POST'])
def ai_feature():
    data = request.json
    result = langraph.process(data.get('text', ''))
    return jsonify({'result': result})

if __name__ == '__main__':
    app.run(host='0.0.0.0', port=5000)
EOF
nohup python3 /home/ubuntu/app.py &
sudo rm /etc/nginx/sites-enabled/default
echo 'server { listen 80; location / { proxy_pass http://localhost:5000; } }' | sudo tee /etc/nginx/sites-available/langraph
sudo ln -s /etc/nginx/sites-available/langraph /etc/nginx/sites-enabled/
sudo systemctl restart nginx
"#;
